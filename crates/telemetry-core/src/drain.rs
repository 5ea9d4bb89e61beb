//! The callback drain: `drain` (spec.md §4.3).

use crate::config::MAX_PAYLOAD;
use crate::consumer::{ConsumerTable, StepOutcome};
use crate::entry::SlotData;
use crate::error::CoreError;
use crate::ring::{ReadOutcome, Ring};

/// One entry handed to a drain callback: a timestamp, schema id and the
/// payload bytes actually written (`payload_size`, not `MAX_PAYLOAD`).
pub struct DrainedEntry {
    pub timestamp: u64,
    pub id: u16,
    payload: [u8; MAX_PAYLOAD],
    payload_size: u16,
}

impl DrainedEntry {
    fn from_slot_data(data: &SlotData) -> Self {
        Self {
            timestamp: data.timestamp,
            id: data.id,
            payload: data.payload,
            payload_size: data.payload_size,
        }
    }

    /// The payload bytes actually logged, `payload_size` of them.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_size as usize]
    }
}

/// `drain` (spec.md §4.3): walks a consumer's cursor toward `head`, handing
/// each accepted entry to `emit`. `emit` returning non-zero stops the drain
/// after that entry (still counted as emitted). Returns the number of
/// entries emitted.
pub(crate) fn drain<F>(
    ring: &Ring,
    table: &ConsumerTable,
    id: usize,
    mut emit: F,
) -> Result<usize, CoreError>
where
    F: FnMut(&DrainedEntry) -> u32,
{
    let head = ring.head();
    let capacity = ring.capacity() as u64;

    table.drain_with(id, head, capacity, |claim, filter| {
        match ring.try_read(claim) {
            ReadOutcome::NotYetPublished => StepOutcome::NotYetPublished,
            ReadOutcome::Overwritten => StepOutcome::Overwritten,
            ReadOutcome::Committed(data) => {
                if !filter.accepts(data.id) {
                    return StepOutcome::Skipped;
                }
                let entry = DrainedEntry::from_slot_data(&data);
                if emit(&entry) == 0 {
                    StepOutcome::Emitted
                } else {
                    StepOutcome::Stop
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn drains_all_published_entries_in_order() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();

        ring.publish(1, b"a", 10);
        ring.publish(2, b"bb", 20);

        let mut seen = Vec::new();
        let emitted = drain(&ring, &table, id, |entry| {
            seen.push((entry.id, entry.payload().to_vec(), entry.timestamp));
            0
        })
        .unwrap();

        assert_eq!(emitted, 2);
        assert_eq!(seen[0], (1, b"a".to_vec(), 10));
        assert_eq!(seen[1], (2, b"bb".to_vec(), 20));
    }

    #[test]
    fn callback_stop_halts_but_counts_final_entry() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::all()).unwrap();

        for i in 0..4u16 {
            ring.publish(i, &[], 0);
        }

        let mut seen = 0;
        let emitted = drain(&ring, &table, id, |_entry| {
            seen += 1;
            if seen == 2 {
                1
            } else {
                0
            }
        })
        .unwrap();

        assert_eq!(emitted, 2);
        assert_eq!(seen, 2);
    }

    #[test]
    fn filter_skips_unwanted_ids_without_stopping() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        let id = table.open(ring.head(), Filter::accepting([2])).unwrap();

        ring.publish(1, b"x", 0);
        ring.publish(2, b"y", 0);
        ring.publish(1, b"z", 0);

        let mut seen = Vec::new();
        let emitted = drain(&ring, &table, id, |entry| {
            seen.push(entry.id);
            0
        })
        .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(seen, vec![2]);
    }

    #[test]
    fn unknown_consumer_id_errors() {
        let ring = Ring::new(16);
        let table = ConsumerTable::new();
        assert!(matches!(
            drain(&ring, &table, 3, |_| 0),
            Err(CoreError::InvalidConsumer { id: 3 })
        ));
    }
}
