//! The ring itself: fixed-capacity slot array, head counter, per-slot
//! sequence publication (spec.md §3 "Ring", §4.1).
//!
//! `head` never wraps in value space; only `claim & mask` wraps. This is
//! the teacher's ABA-avoidance argument in `ring.rs` carried over verbatim:
//! with 2^64 claim values, wrap-around is not a practical concern.

use crate::config::MAX_PAYLOAD;
use crate::entry::{Slot, SlotData};
use crate::invariants::debug_assert_committed;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of the two-phase acquire-copy-acquire read in spec.md §4.3.
pub(crate) enum ReadOutcome {
    /// The producer has not yet published this slot.
    NotYetPublished,
    /// A torn read: the slot was overwritten during the copy.
    Overwritten,
    /// A clean copy, safe to hand to a caller.
    Committed(SlotData),
}

/// The lock-free MPMC ring buffer.
pub(crate) struct Ring {
    /// Monotonically increasing claim counter. Never wraps in value space.
    head: CachePadded<AtomicU64>,
    capacity: usize,
    mask: usize,
    slots: Box<[Slot]>,
}

// SAFETY: `Ring` is Sync because all cross-thread access to `slots[i].data`
// goes through the acquire/release protocol on `slots[i].seq` (spec.md
// §4.1, §4.3). There is no other shared mutable state.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be nonzero");
        assert!(
            capacity.is_power_of_two(),
            "ring capacity must be a power of two"
        );

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::new);

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            capacity,
            mask: capacity - 1,
            slots: slots.into_boxed_slice(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn slot(&self, claim: u64) -> &Slot {
        &self.slots[(claim as usize) & self.mask]
    }

    /// Acquire load of `head`: the position a newly opened consumer starts
    /// at, and the bound every drain walks toward.
    #[inline]
    pub(crate) fn head(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    /// The producer path (spec.md §4.1, steps 1-5). Infallible, wait-free,
    /// never blocks. `payload.len()` must be `<= MAX_PAYLOAD`; the caller
    /// (`Context::log`) is responsible for that bound.
    pub(crate) fn publish(&self, id: u16, payload: &[u8], timestamp: u64) {
        debug_assert!(
            payload.len() <= MAX_PAYLOAD,
            "payload of {} bytes exceeds MAX_PAYLOAD",
            payload.len()
        );

        // Step 1: claim a slot number. The only synchronising cost on the
        // hot path; everything after this is ordinary stores.
        let claim = self.head.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(claim);

        // Step 2/3: invalidate before mutating. Any consumer observing
        // seq == 0 (or seq != claim + 1) treats the slot as uncommitted.
        slot.seq.store(0, Ordering::Release);

        // Step 4: write payload fields. Not atomic; visibility is bounded
        // by the seq release/acquire pair below, not by these stores.
        //
        // SAFETY: seq was just invalidated by this thread and has not yet
        // been republished, so no consumer will read `data` until the
        // release store below is observed by an acquire load.
        unsafe {
            let data = slot.data_mut();
            data.timestamp = timestamp;
            data.id = id;
            data.payload_size = payload.len() as u16;
            data.payload[..payload.len()].copy_from_slice(payload);
        }

        // Step 5: publish. Makes the writes above visible to any consumer
        // that subsequently acquire-loads this seq.
        let published = claim.wrapping_add(1);
        debug_assert_committed!(claim, published);
        slot.seq.store(published, Ordering::Release);
    }

    /// The two-phase acquire-copy-acquire read (spec.md §4.3, steps 1-3):
    /// the torn-read guard that turns a simultaneous overwrite into an
    /// accounted drop rather than corrupt data reaching a callback.
    pub(crate) fn try_read(&self, claim: u64) -> ReadOutcome {
        let slot = self.slot(claim);
        let expected = claim.wrapping_add(1);

        let seq1 = slot.seq.load(Ordering::Acquire);
        if seq1 != expected {
            return ReadOutcome::NotYetPublished;
        }

        // SAFETY: seq1 == expected was just observed via acquire load, so
        // the producer's release store (and the payload writes that
        // preceded it) are visible here.
        let copy = unsafe { *slot.data() };

        let seq2 = slot.seq.load(Ordering::Acquire);
        if seq2 != seq1 {
            return ReadOutcome::Overwritten;
        }

        ReadOutcome::Committed(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_read_round_trips_payload() {
        let ring = Ring::new(16);
        ring.publish(7, &[1, 2, 3, 4], 42);

        match ring.try_read(0) {
            ReadOutcome::Committed(data) => {
                assert_eq!(data.id, 7);
                assert_eq!(data.timestamp, 42);
                assert_eq!(data.payload_size, 4);
                assert_eq!(&data.payload[..4], &[1, 2, 3, 4]);
            }
            _ => panic!("expected a committed read"),
        }
    }

    #[test]
    fn unpublished_slot_is_not_yet_published() {
        let ring = Ring::new(16);
        assert!(matches!(ring.try_read(0), ReadOutcome::NotYetPublished));
    }

    #[test]
    fn lapped_slot_reads_the_newer_publication() {
        let ring = Ring::new(4);
        for i in 0..8u32 {
            ring.publish(0, &i.to_ne_bytes(), u64::from(i));
        }
        // Claim value 4 and claim value 0 share slot index 0; only the
        // newer publication (claim 4) should be visible there now.
        match ring.try_read(4) {
            ReadOutcome::Committed(data) => assert_eq!(data.timestamp, 4),
            _ => panic!("expected claim 4 to be committed"),
        }
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_capacity_panics() {
        Ring::new(3);
    }
}
