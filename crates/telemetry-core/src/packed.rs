//! The packed-batch drain: `drain_packed` (spec.md §4.4).
//!
//! Lays out `[PacketHeader | EntryHeader x N | PayloadArea]` in a single
//! pass over the caller's buffer. Because the final entry count isn't known
//! until the walk stops (a buffer-full or a lapped producer can end it
//! early), the header region is provisionally reserved at its maximum
//! possible size and payloads are appended after that reservation; once the
//! walk ends, a single `copy_within` compacts the payload area left to sit
//! directly after the entry headers actually used.

use crate::config::MAX_PAYLOAD;
use crate::consumer::{ConsumerTable, StepOutcome};
use crate::error::CoreError;
use crate::ring::{ReadOutcome, Ring};
use crate::wire::{EntryHeader, PacketHeader};

/// `drain_packed` (spec.md §4.4): fills `buf` with as many entries as fit,
/// starting from the consumer's cursor, and returns the total packet length
/// written. `buf` must be at least `PacketHeader::SIZE` bytes.
pub(crate) fn drain_packed(
    ring: &Ring,
    table: &ConsumerTable,
    id: usize,
    buf: &mut [u8],
) -> Result<usize, CoreError> {
    if buf.len() < PacketHeader::SIZE {
        return Err(CoreError::BufferTooSmall {
            needed: PacketHeader::SIZE,
            got: buf.len(),
        });
    }

    let head = ring.head();
    let capacity = ring.capacity() as u64;

    // spec.md §4.4 step 1: nothing to drain, or a buffer too small to hold
    // even one EntryHeader, both return 0 with the cursor and drop counters
    // untouched — no walk is attempted at all, so the caller can grow its
    // buffer (or simply retry later) without losing anything.
    let (available, _pending_dropped) = table.available(id, head, capacity)?;
    let max_entries_by_buf = (buf.len() - PacketHeader::SIZE) / EntryHeader::SIZE;
    let max_entries = available.min(capacity).min(max_entries_by_buf as u64) as usize;
    if available == 0 || max_entries == 0 {
        return Ok(0);
    }
    let headers_region_start = PacketHeader::SIZE;
    let headers_region_len = max_entries * EntryHeader::SIZE;
    let payload_region_start = headers_region_start + headers_region_len;

    let mut headers: Vec<EntryHeader> = Vec::with_capacity(max_entries);
    let mut payload_cursor = payload_region_start;

    table.drain_with(id, head, capacity, |claim, filter| {
        if headers.len() >= max_entries {
            return StepOutcome::NotYetPublished; // out of room, stop the walk
        }
        match ring.try_read(claim) {
            ReadOutcome::NotYetPublished => StepOutcome::NotYetPublished,
            ReadOutcome::Overwritten => StepOutcome::Overwritten,
            ReadOutcome::Committed(data) => {
                if !filter.accepts(data.id) {
                    return StepOutcome::Skipped;
                }
                let size = data.payload_size as usize;
                if payload_cursor + size > buf.len() {
                    return StepOutcome::NotYetPublished; // buffer full, stop
                }
                debug_assert!(size <= MAX_PAYLOAD);
                buf[payload_cursor..payload_cursor + size]
                    .copy_from_slice(&data.payload[..size]);
                headers.push(EntryHeader {
                    id: data.id,
                    payload_size: data.payload_size,
                    payload_offset: (payload_cursor - payload_region_start) as u32,
                    timestamp: data.timestamp,
                });
                payload_cursor += size;
                StepOutcome::Emitted
            }
        }
    })?;

    let entry_count = headers.len();
    let payload_bytes = payload_cursor - payload_region_start;
    let used_headers_len = entry_count * EntryHeader::SIZE;
    let actual_payload_start = headers_region_start + used_headers_len;

    // Compact: slide the payload area left to close the gap left by the
    // over-reserved header region.
    if used_headers_len < headers_region_len && payload_bytes > 0 {
        buf.copy_within(
            payload_region_start..payload_region_start + payload_bytes,
            actual_payload_start,
        );
    }

    for (i, header) in headers.iter().enumerate() {
        let off = headers_region_start + i * EntryHeader::SIZE;
        header.encode(&mut buf[off..off + EntryHeader::SIZE]);
    }

    let dropped = table.take_dropped_delta(id)?;
    let packet_header = PacketHeader {
        entry_count: entry_count as u16,
        flags: 0,
        payload_size: payload_bytes as u32,
        dropped,
        reserved: 0,
    };
    packet_header.encode(&mut buf[0..PacketHeader::SIZE]);

    Ok(actual_payload_start + payload_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn packs_all_entries_when_buffer_is_ample() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();

        ring.publish(1, b"abc", 10);
        ring.publish(2, b"de", 20);

        let mut buf = [0u8; 4096];
        let len = drain_packed(&ring, &table, id, &mut buf).unwrap();

        let header = PacketHeader::decode(&buf[..PacketHeader::SIZE]);
        assert_eq!(header.entry_count, 2);
        assert_eq!(header.payload_size, 5);
        assert_eq!(header.dropped, 0);

        let h0 = EntryHeader::decode(&buf[PacketHeader::SIZE..PacketHeader::SIZE + 16]);
        let h1 = EntryHeader::decode(
            &buf[PacketHeader::SIZE + 16..PacketHeader::SIZE + 32],
        );
        let payload_start = PacketHeader::SIZE + 2 * EntryHeader::SIZE;
        assert_eq!(h0.payload_offset, 0);
        assert_eq!(
            &buf[payload_start..payload_start + h0.payload_size as usize],
            b"abc"
        );
        assert_eq!(h1.payload_offset, 3);
        assert_eq!(
            &buf[payload_start + h1.payload_offset as usize
                ..payload_start + h1.payload_offset as usize + h1.payload_size as usize],
            b"de"
        );
        assert_eq!(len, payload_start + 5);
    }

    #[test]
    fn stops_and_leaves_remainder_for_next_call_when_buffer_is_small() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();

        for i in 0..4u16 {
            ring.publish(i, &[0xAB; 8], u64::from(i));
        }

        // Room for exactly one EntryHeader + its 8-byte payload.
        let mut buf = [0u8; 16 + 16 + 8];
        let len = drain_packed(&ring, &table, id, &mut buf).unwrap();
        let header = PacketHeader::decode(&buf[..PacketHeader::SIZE]);
        assert_eq!(header.entry_count, 1);
        assert!(len <= buf.len());

        // Second call picks up where the first left off.
        let mut buf2 = [0u8; 4096];
        let len2 = drain_packed(&ring, &table, id, &mut buf2).unwrap();
        let header2 = PacketHeader::decode(&buf2[..PacketHeader::SIZE]);
        assert_eq!(header2.entry_count, 3);
        assert!(len2 > 0);
    }

    #[test]
    fn dropped_delta_is_reported_once() {
        let ring = Ring::new(4);
        let table = ConsumerTable::new();
        let id = table.open(0, Filter::all()).unwrap();

        for i in 0..8u16 {
            ring.publish(i, &[], u64::from(i));
        }

        let mut buf = [0u8; 4096];
        let len1 = drain_packed(&ring, &table, id, &mut buf).unwrap();
        let header1 = PacketHeader::decode(&buf[..PacketHeader::SIZE]);
        assert_eq!(header1.dropped, 4);
        assert!(len1 > 0);

        let mut buf2 = [0u8; 4096];
        drain_packed(&ring, &table, id, &mut buf2).unwrap();
        let header2 = PacketHeader::decode(&buf2[..PacketHeader::SIZE]);
        assert_eq!(header2.dropped, 0);
    }

    #[test]
    fn buffer_smaller_than_packet_header_errors() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            drain_packed(&ring, &table, id, &mut buf),
            Err(CoreError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn empty_ring_returns_zero_with_nothing_consumed() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();
        let mut buf = [0u8; 4096];
        assert_eq!(drain_packed(&ring, &table, id, &mut buf).unwrap(), 0);
    }

    #[test]
    fn buffer_holding_only_a_packet_header_returns_zero_and_preserves_entries() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();
        ring.publish(1, b"abc", 10);

        let mut buf = [0u8; PacketHeader::SIZE];
        let len = drain_packed(&ring, &table, id, &mut buf).unwrap();
        assert_eq!(len, 0);

        // The entry is still there for a call with a properly sized buffer.
        let mut buf2 = [0u8; 4096];
        let len2 = drain_packed(&ring, &table, id, &mut buf2).unwrap();
        let header2 = PacketHeader::decode(&buf2[..PacketHeader::SIZE]);
        assert_eq!(header2.entry_count, 1);
        assert!(len2 > 0);
    }
}
