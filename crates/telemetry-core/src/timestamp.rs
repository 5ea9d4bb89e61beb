//! The one tunable behaviour in the core (spec.md §9): where `timestamp`
//! comes from.
//!
//! Default: monotonic wall-clock nanoseconds via [`std::time::Instant`]
//! anchored at process start. Embedded targets without a wall clock can
//! swap in their own source via [`Context::with_timestamp_fn`].

use std::sync::OnceLock;
use std::time::Instant;

fn epoch() -> &'static Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now)
}

/// Default timestamp source: nanoseconds since the first call in this
/// process (monotonic, not wall-clock-comparable across processes).
#[must_use]
pub fn monotonic_nanos() -> u64 {
    epoch().elapsed().as_nanos() as u64
}

/// A pluggable timestamp source.
pub type TimestampFn = fn() -> u64;
