//! Per-consumer cursor, drop accounting and the fixed consumer table
//! (spec.md §3 "Consumer", §4.2).

use crate::config::MAX_CLIENTS;
use crate::error::CoreError;
use crate::filter::Filter;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One consumer's state: a slot in the fixed-size consumer table.
///
/// `cursor`, `dropped` and `dropped_reported` are atomics so that
/// `consumer_available` can read them without taking any lock (spec.md
/// §4.2: "Pure read; does not mutate cursor or `dropped`."). `filter` sits
/// behind an `UnsafeCell` rather than an atomic or a mutex: spec.md §4.2
/// requires `consumer_set_filter` be "safe to call only from a thread that
/// is not concurrently draining `id`" — a caller-enforced single-writer
/// contract, the same flavour as the teacher's `cached_head`/`cached_tail`
/// fields in `ring.rs`.
struct ConsumerSlot {
    active: AtomicBool,
    cursor: AtomicU64,
    dropped: AtomicU64,
    dropped_reported: AtomicU64,
    filter: UnsafeCell<Filter>,
}

// SAFETY: `filter` is only ever read or written while the caller upholds
// the single-writer contract documented on `ConsumerSlot` and on
// `consumer_set_filter`.
unsafe impl Sync for ConsumerSlot {}

impl ConsumerSlot {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            cursor: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            dropped_reported: AtomicU64::new(0),
            filter: UnsafeCell::new(Filter::all()),
        }
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// # Safety
    /// Caller must not be concurrently draining this slot.
    #[inline]
    unsafe fn filter(&self) -> &Filter {
        // SAFETY: forwarded to the caller.
        unsafe { &*self.filter.get() }
    }
}

/// The fixed-size table of up to `MAX_CLIENTS` consumers.
pub(crate) struct ConsumerTable {
    slots: [ConsumerSlot; MAX_CLIENTS],
}

impl ConsumerTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| ConsumerSlot::new()),
        }
    }

    fn slot(&self, id: usize) -> Result<&ConsumerSlot, CoreError> {
        self.slots
            .get(id)
            .filter(|s| s.is_active())
            .ok_or(CoreError::InvalidConsumer { id })
    }

    /// `consumer_open` (spec.md §4.2): claims the first inactive slot,
    /// starting the cursor at `head` ("now" — no historical playback).
    pub(crate) fn open(&self, head: u64, filter: Filter) -> Result<usize, CoreError> {
        for (id, slot) in self.slots.iter().enumerate() {
            if slot
                .active
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                slot.cursor.store(head, Ordering::Relaxed);
                slot.dropped.store(0, Ordering::Relaxed);
                slot.dropped_reported.store(0, Ordering::Relaxed);
                // SAFETY: this slot was just claimed; nothing else can be
                // concurrently draining an id that was inactive a moment
                // ago (a caller cannot have an id for a slot it has not
                // yet received from `open`).
                unsafe {
                    *slot.filter.get() = filter;
                }
                return Ok(id);
            }
        }
        Err(CoreError::NoFreeConsumerSlot { max: MAX_CLIENTS })
    }

    /// `consumer_close` (spec.md §4.2): discards cursor, drop counts and
    /// filter by simply marking the slot inactive.
    pub(crate) fn close(&self, id: usize) {
        if let Some(slot) = self.slots.get(id) {
            slot.active.store(false, Ordering::Release);
        }
    }

    /// `consumer_set_filter` (spec.md §4.2). See the single-writer
    /// contract on [`ConsumerSlot`].
    ///
    /// # Safety
    /// The caller must guarantee no thread is concurrently draining `id`.
    pub(crate) unsafe fn set_filter(&self, id: usize, filter: Filter) -> Result<(), CoreError> {
        let slot = self.slot(id)?;
        // SAFETY: forwarded to the caller.
        unsafe {
            *slot.filter.get() = filter;
        }
        Ok(())
    }

    /// `consumer_available` (spec.md §4.2): pure read, does not mutate
    /// cursor or `dropped`.
    pub(crate) fn available(
        &self,
        id: usize,
        head: u64,
        capacity: u64,
    ) -> Result<(u64, u64), CoreError> {
        let slot = self.slot(id)?;
        let cursor = slot.cursor.load(Ordering::Acquire);
        let oldest = head.saturating_sub(capacity);
        let effective = cursor.max(oldest);
        let available = head.saturating_sub(effective);
        let pending_dropped = oldest.saturating_sub(cursor);
        Ok((available, pending_dropped))
    }

    /// Walks from `cursor` toward `head`, calling `visit` for each claim
    /// value in order. `visit` returns `true` to keep walking, `false` to
    /// stop early (spec.md §4.3 step 6's "non-zero return halts the
    /// drain"). Handles the overwrite catch-up (§4.2) before and during
    /// the walk, and persists the advanced cursor / accumulated drops back
    /// into the slot when done.
    ///
    /// Returns `Err(InvalidConsumer)` if `id` is inactive or out of range.
    pub(crate) fn drain_with<F>(
        &self,
        id: usize,
        head: u64,
        capacity: u64,
        mut visit: F,
    ) -> Result<usize, CoreError>
    where
        F: FnMut(u64, &Filter) -> StepOutcome,
    {
        let slot = self.slot(id)?;

        let mut cursor = slot.cursor.load(Ordering::Acquire);
        let oldest = head.saturating_sub(capacity);
        let mut dropped = slot.dropped.load(Ordering::Relaxed);

        if cursor < oldest {
            dropped += oldest - cursor;
            cursor = oldest;
        }

        let mut emitted = 0usize;
        // SAFETY: caller (drain/drain_packed) upholds the single-writer
        // contract: filter is not mutated while a drain on this id is
        // in flight.
        let filter = unsafe { slot.filter() };

        while cursor < head {
            match visit(cursor, filter) {
                StepOutcome::Emitted => {
                    cursor += 1;
                    emitted += 1;
                }
                StepOutcome::Skipped => {
                    cursor += 1;
                }
                StepOutcome::Overwritten => {
                    cursor += 1;
                    dropped += 1;
                }
                StepOutcome::NotYetPublished => break,
                StepOutcome::Stop => {
                    cursor += 1;
                    emitted += 1;
                    break;
                }
            }
        }

        crate::invariants::debug_assert_cursor_bounded!(cursor, head);
        slot.cursor.store(cursor, Ordering::Release);
        slot.dropped.store(dropped, Ordering::Relaxed);
        Ok(emitted)
    }

    /// Delta of `dropped` not yet reflected in an emitted packet, and a
    /// bump of `dropped_reported` by that (saturated) delta. Used only by
    /// the packed-batch drain (spec.md §4.4 step 5).
    pub(crate) fn take_dropped_delta(&self, id: usize) -> Result<u32, CoreError> {
        let slot = self.slot(id)?;
        let dropped = slot.dropped.load(Ordering::Relaxed);
        let reported = slot.dropped_reported.load(Ordering::Relaxed);
        let delta = dropped.saturating_sub(reported);
        let delta32 = u32::try_from(delta).unwrap_or(u32::MAX);
        slot.dropped_reported
            .store(reported + u64::from(delta32), Ordering::Relaxed);
        crate::invariants::debug_assert_drop_accounting!(
            slot.dropped.load(Ordering::Relaxed),
            slot.dropped_reported.load(Ordering::Relaxed)
        );
        Ok(delta32)
    }

    /// Total cumulative drops for a consumer (used by tests and by
    /// callers that want the raw counter rather than a delta).
    pub(crate) fn dropped_total(&self, id: usize) -> Result<u64, CoreError> {
        Ok(self.slot(id)?.dropped.load(Ordering::Relaxed))
    }
}

/// What happened to one claim value during a drain walk (spec.md §4.3).
pub(crate) enum StepOutcome {
    /// The entry was committed, accepted by the filter, and handed to the
    /// caller's sink.
    Emitted,
    /// The entry was committed but rejected by the filter.
    Skipped,
    /// A torn read: the slot was overwritten mid-copy.
    Overwritten,
    /// The producer has not yet published this claim value; stop here.
    NotYetPublished,
    /// The caller's emit callback asked to stop after this entry.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_starts_cursor_at_head_no_backfill() {
        let table = ConsumerTable::new();
        let id = table.open(100, Filter::all()).unwrap();
        let (available, pending) = table.available(id, 100, 16).unwrap();
        assert_eq!(available, 0);
        assert_eq!(pending, 0);
    }

    #[test]
    fn close_then_reopen_discards_state() {
        let table = ConsumerTable::new();
        let id = table.open(10, Filter::all()).unwrap();
        table.close(id);
        let id2 = table.open(50, Filter::all()).unwrap();
        assert_eq!(id, id2);
        let (available, _) = table.available(id2, 50, 16).unwrap();
        assert_eq!(available, 0);
    }

    #[test]
    fn table_exhaustion_returns_no_free_slot() {
        let table = ConsumerTable::new();
        let mut ids = Vec::new();
        for _ in 0..MAX_CLIENTS {
            ids.push(table.open(0, Filter::all()).unwrap());
        }
        assert!(matches!(
            table.open(0, Filter::all()),
            Err(CoreError::NoFreeConsumerSlot { .. })
        ));
    }

    #[test]
    fn available_accounts_pending_drops_without_mutating_state() {
        let table = ConsumerTable::new();
        let id = table.open(0, Filter::all()).unwrap();
        // Producer has advanced head by more than capacity: consumer is lapped.
        let (available, pending) = table.available(id, 40, 16).unwrap();
        assert_eq!(available, 16);
        assert_eq!(pending, 24);

        // Reading again must not have mutated anything.
        let (available2, pending2) = table.available(id, 40, 16).unwrap();
        assert_eq!(available, available2);
        assert_eq!(pending, pending2);
    }
}
