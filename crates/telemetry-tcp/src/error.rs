//! Error taxonomy for the TCP collaborator.
//!
//! Mirrors `telemetry-core`'s `CoreError` in shape (small `thiserror`-derived
//! enum, one variant per failure mode) and folds the core's own errors in
//! via `#[from]`, the same convention `ringmpsc-stream`'s `StreamError` uses
//! for its inner channel errors.

use std::io;
use telemetry_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the accept loop and per-connection drain/serve.
#[derive(Debug, Error)]
pub enum TcpError {
    /// A socket operation (bind, accept, read, write) failed.
    #[error("tcp io error: {0}")]
    Io(#[from] io::Error),

    /// The core rejected a consumer or schema operation.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl TcpError {
    /// `true` for a plain peer disconnect (the ordinary way a per-client
    /// thread ends), as opposed to a genuine server-side misconfiguration.
    #[must_use]
    pub fn is_peer_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            )
        )
    }
}
