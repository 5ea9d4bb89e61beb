//! Thin TCP server wrapper around `telemetry-core`'s packed-batch drain.
//!
//! This crate adds no policy on top of the core: it opens one consumer per
//! accepted connection, sends the one-shot schema blob, then forwards
//! `drain_packed` output as length-prefixed frames (spec.md §6 "Wire
//! protocol (default TCP collaborator)"). There is no retry, reconnect, or
//! backpressure handling here — a write error simply ends that connection's
//! thread; the producer side of the core is entirely unaffected.

mod error;
mod server;

pub use error::TcpError;
pub use server::{serve, serve_connection, ServerConfig};
