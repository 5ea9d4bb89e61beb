//! Error taxonomy for the `.btlm` file collaborator.

use std::io;
use telemetry_core::CoreError;
use thiserror::Error;

/// Errors surfaced while writing or finalising a `.btlm` file.
#[derive(Debug, Error)]
pub enum FileError {
    /// A filesystem operation failed.
    #[error("file io error: {0}")]
    Io(#[from] io::Error),

    /// The core rejected a consumer or schema operation.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The footer index grew past `u32::MAX` entries, which would overflow
    /// `IndexFooter::index_count`.
    #[error("index has too many entries to fit in a u32 count")]
    IndexOverflow,
}
