//! Error taxonomy for the core (spec.md §7).
//!
//! Modelled directly on the teacher's `ChannelError` in `channel.rs`: small,
//! `Copy`-able enums derived with `thiserror`, no `Box<dyn Error>` anywhere.
//! The producer path (`log`) never returns one of these — it is infallible
//! by design.

use thiserror::Error;

/// Errors returned by the core's non-producer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A bad argument: non-power-of-two ring capacity, out-of-range
    /// consumer id, or a malformed schema descriptor.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `register` was called with `id >= MAX_SCHEMA_ENTRIES`.
    #[error("invalid schema id {id} (max {max})")]
    InvalidSchemaId {
        /// The offending id.
        id: u16,
        /// `MAX_SCHEMA_ENTRIES - 1`.
        max: u16,
    },

    /// `register` was called with a payload larger than `MAX_PAYLOAD`.
    #[error("schema payload size {size} exceeds MAX_PAYLOAD ({max})")]
    PayloadTooLarge {
        /// The offending size.
        size: usize,
        /// `MAX_PAYLOAD`.
        max: usize,
    },

    /// `consumer_open` found no inactive slot in the consumer table.
    #[error("no free consumer slot (max {max})")]
    NoFreeConsumerSlot {
        /// `MAX_CLIENTS`.
        max: usize,
    },

    /// A drain or serialise output buffer is smaller than required.
    #[error("buffer too small: need at least {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Minimum buffer size that would have succeeded.
        needed: usize,
        /// The buffer size that was actually passed.
        got: usize,
    },

    /// `drain`/`drain_packed` was called on an inactive or out-of-range id.
    #[error("consumer {id} is not active")]
    InvalidConsumer {
        /// The offending consumer id.
        id: usize,
    },
}

impl CoreError {
    /// Returns `true` for errors that reflect caller misuse rather than
    /// transient conditions (everything but [`CoreError::NoFreeConsumerSlot`]
    /// and [`CoreError::BufferTooSmall`], which a caller can legitimately
    /// retry after freeing a slot or growing its buffer).
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        !matches!(
            self,
            Self::NoFreeConsumerSlot { .. } | Self::BufferTooSmall { .. }
        )
    }
}

/// Streaming schema serialisation was aborted by the caller's callback.
///
/// Not an error in the usual sense (spec.md §4.6/§7): `stream` surfaces this
/// as the `Err` arm purely so callers can use `?`, but it always means "the
/// callback asked to stop", never "something went wrong".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("schema stream aborted by callback")]
pub struct Aborted;
