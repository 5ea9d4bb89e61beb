//! Thin `.btlm` file sink for `telemetry-core`'s packed batches, with a
//! trailing footer index (spec.md §6).
//!
//! Like `telemetry-tcp`, this crate adds no policy beyond framing: it opens
//! one consumer, writes the header and schema blob once, then appends
//! `drain_packed` output as self-contained packets while tracking where
//! each one landed so [`FileSink::finalize`] can emit a footer a reader can
//! use to seek directly to any packet.

mod error;
mod format;

pub use error::FileError;
pub use format::{capture, FileSink};
