//! Debug assertion macros for the invariants documented in spec.md §3.
//!
//! Zero overhead in release builds (`#[cfg(debug_assertions)]`), same
//! convention as the teacher's `invariants.rs`.

/// INV-1: a slot committed for claim value `claim` has `seq == claim + 1`.
///
/// Used in: `Ring::publish` after the release store.
macro_rules! debug_assert_committed {
    ($claim:expr, $seq:expr) => {
        debug_assert!(
            $seq == $claim.wrapping_add(1),
            "slot committed for claim {} has seq {} (expected {})",
            $claim,
            $seq,
            $claim.wrapping_add(1)
        )
    };
}

/// INV-2: a consumer's cursor never runs ahead of `head`.
///
/// Used in: drain entry points, after recomputing `oldest`.
macro_rules! debug_assert_cursor_bounded {
    ($cursor:expr, $head:expr) => {
        debug_assert!(
            $cursor <= $head,
            "cursor {} ran ahead of head {}",
            $cursor,
            $head
        )
    };
}

/// INV-3: `dropped_reported` never exceeds `dropped`.
///
/// Used in: packed-batch drain, after updating `dropped_reported`.
macro_rules! debug_assert_drop_accounting {
    ($dropped:expr, $reported:expr) => {
        debug_assert!(
            $reported <= $dropped,
            "dropped_reported {} exceeds dropped {}",
            $reported,
            $dropped
        )
    };
}

/// INV-4: a registered schema fits the configured limits.
///
/// Used in: `SchemaRegistry::register`.
macro_rules! debug_assert_schema_bounds {
    ($id:expr, $payload_size:expr) => {
        debug_assert!(
            ($id as usize) < crate::config::MAX_SCHEMA_ENTRIES,
            "schema id {} out of range",
            $id
        );
        debug_assert!(
            $payload_size <= crate::config::MAX_PAYLOAD,
            "schema payload size {} exceeds MAX_PAYLOAD",
            $payload_size
        );
    };
}

pub(crate) use debug_assert_committed;
pub(crate) use debug_assert_cursor_bounded;
pub(crate) use debug_assert_drop_accounting;
pub(crate) use debug_assert_schema_bounds;
