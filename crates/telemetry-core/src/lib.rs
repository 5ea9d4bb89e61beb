//! A zero-copy, lock-free MPMC telemetry ring buffer with a self-describing
//! schema wire format.
//!
//! A [`Context`] owns one fixed-capacity [`Ring`](ring::Ring), a fixed table
//! of up to [`config::MAX_CLIENTS`] consumers and a registry of up to
//! [`config::MAX_SCHEMA_ENTRIES`] schema descriptors. Producers call
//! [`Context::log`]/[`Context::log_value`] from any number of threads with
//! no synchronisation beyond a single atomic increment; consumers open a
//! cursor with [`Context::consumer_open`] and drain committed entries with
//! [`Context::drain`] (callback form) or [`Context::drain_packed`]
//! (self-contained wire packets, for a network or file collaborator to
//! forward untouched). [`Context::schema_serialize`]/[`Context::schema_stream`]
//! produce a self-describing schema blob so a downstream reader never needs
//! the producer's source to decode a packet.
//!
//! This crate has no knowledge of sockets or files: `telemetry-tcp` and
//! `telemetry-file` are thin collaborators built on top of the public
//! operations here.

mod config;
mod consumer;
mod context;
mod drain;
mod entry;
mod error;
mod filter;
mod invariants;
mod packed;
mod ring;
mod schema;
mod serialize;
mod timestamp;
mod wire;

pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use context::Context;
pub use drain::DrainedEntry;
pub use error::{Aborted, CoreError};
pub use filter::Filter;
pub use schema::{BitSubField, Field, FieldType, SchemaEntryDescriptor};
pub use timestamp::{monotonic_nanos, TimestampFn};
pub use wire::{
    BitfieldWire, EntryHeader, EnumWire, FieldWire, IndexEntry, IndexFooter, PacketHeader,
    SchemaHeader, SchemaWire, NATIVE_ENDIANNESS,
};
