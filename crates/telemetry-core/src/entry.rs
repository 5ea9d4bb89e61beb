//! The fixed-size ring slot (spec.md §3 "Entry").
//!
//! Every slot has identical layout: an atomic `seq` used for publication
//! (spec.md §4.1) plus the payload fields, which are ordinary (non-atomic)
//! memory protected entirely by the `seq` protocol — the same pattern the
//! teacher's `Ring<T>` uses for its `buffer: UnsafeCell<Box<[MaybeUninit<T>]>>`.

use crate::config::MAX_PAYLOAD;
use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU64;

/// The non-atomic half of a slot: timestamp, schema id, payload length and
/// the payload bytes themselves.
///
/// Padded so that `size_of::<Slot>() == crate::config::ENTRY_SIZE` (256 B
/// with the default `MAX_PAYLOAD`), matching the "single cache-line
/// multiple" invariant from spec.md §3.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct SlotData {
    pub timestamp: u64,
    pub id: u16,
    pub payload_size: u16,
    pub payload: [u8; MAX_PAYLOAD],
    _pad: [u8; 4],
}

impl SlotData {
    const fn zeroed() -> Self {
        Self {
            timestamp: 0,
            id: 0,
            payload_size: 0,
            payload: [0; MAX_PAYLOAD],
            _pad: [0; 4],
        }
    }
}

/// One ring slot: an atomic sequence number plus its payload.
///
/// `seq == 0` or `seq != claim_value + 1` means "not committed for this
/// claim" (spec.md invariant 2). `data` is read/written under the
/// acquire/release discipline on `seq`, never under its own lock — this is
/// the direct analogue of the teacher's single-writer `UnsafeCell` fields,
/// except here both "writers" (producer, then the next producer that laps
/// this slot) are serialised by the seq protocol rather than by being a
/// single fixed thread.
#[repr(C)]
pub(crate) struct Slot {
    pub seq: AtomicU64,
    data: UnsafeCell<SlotData>,
}

// SAFETY: all access to `data` goes through the acquire/release protocol on
// `seq` (see ring.rs); there is never more than one writer at a time by
// construction (only the producer that most recently incremented `head`
// past this slot may write it, and it does so before publishing `seq`).
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    pub(crate) fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            data: UnsafeCell::new(SlotData::zeroed()),
        }
    }

    /// Mutable access to the payload fields. Caller must hold the producer
    /// side of the seq protocol (invalidated but not yet republished).
    ///
    /// # Safety
    ///
    /// Must only be called between `store_release(seq, 0)` and the
    /// subsequent `store_release(seq, claim + 1)` for this slot.
    #[inline]
    pub(crate) unsafe fn data_mut(&self) -> &mut SlotData {
        // SAFETY: forwarded to the caller.
        unsafe { &mut *self.data.get() }
    }

    /// Read-only access to the payload fields for a consumer that has just
    /// performed an acquire load observing this slot as committed.
    ///
    /// # Safety
    ///
    /// Must only be called after an acquire load of `seq` observed the
    /// slot committed for the claim value the caller expects.
    #[inline]
    pub(crate) unsafe fn data(&self) -> &SlotData {
        // SAFETY: forwarded to the caller.
        unsafe { &*self.data.get() }
    }
}

const _: () = assert!(
    std::mem::size_of::<Slot>() == crate::config::ENTRY_SIZE,
    "Slot size drifted from ENTRY_SIZE; adjust padding or MAX_PAYLOAD"
);
