//! `Context`: the ownership root tying a ring, its consumer table and its
//! schema registry together (spec.md §4, §6 "Public Operations").

use crate::config::{Config, MAX_PAYLOAD};
use crate::consumer::ConsumerTable;
use crate::drain::{drain, DrainedEntry};
use crate::error::{Aborted, CoreError};
use crate::filter::Filter;
use crate::packed::drain_packed;
use crate::ring::Ring;
use crate::schema::SchemaEntryDescriptor;
use crate::schema::SchemaRegistry;
use crate::serialize::{schema_serialize, schema_stream};
use crate::timestamp::{monotonic_nanos, TimestampFn};

/// One ring, its schema registry and its consumer table, as a single unit
/// (spec.md §6). `'a` is the lifetime schema descriptors passed to
/// [`Context::register`] must outlive.
pub struct Context<'a> {
    pub(crate) ring: Ring,
    pub(crate) table: ConsumerTable,
    pub(crate) registry: SchemaRegistry<'a>,
    timestamp_fn: TimestampFn,
}

impl<'a> Context<'a> {
    /// `context_init` (spec.md §6): builds a fresh ring, table and registry.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            ring: Ring::new(config.entry_count),
            table: ConsumerTable::new(),
            registry: SchemaRegistry::new(),
            timestamp_fn: monotonic_nanos,
        }
    }

    /// Overrides the timestamp source (spec.md §9's one tunable hook).
    /// Default is [`monotonic_nanos`].
    #[must_use]
    pub fn with_timestamp_fn(mut self, timestamp_fn: TimestampFn) -> Self {
        self.timestamp_fn = timestamp_fn;
        self
    }

    /// `register` (spec.md §4.5): adds a schema descriptor to the registry.
    pub fn register(&mut self, descriptor: &'a SchemaEntryDescriptor) -> Result<(), CoreError> {
        self.registry.register(descriptor)
    }

    /// `log` (spec.md §4.1): publishes one entry. Infallible on the ring
    /// itself; the only failure mode here is a payload that does not fit
    /// `MAX_PAYLOAD`, checked before the wait-free publish path is entered.
    pub fn log(&self, id: u16, payload: &[u8]) -> Result<(), CoreError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(CoreError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let timestamp = (self.timestamp_fn)();
        self.ring.publish(id, payload, timestamp);
        Ok(())
    }

    /// Convenience over [`Context::log`] for a `Copy` value: logs its raw
    /// bytes as the payload.
    ///
    /// # Panics
    ///
    /// Panics if `size_of::<T>() > MAX_PAYLOAD` — a schema/type mismatch a
    /// caller should catch in development, not recover from at runtime.
    pub fn log_value<T: Copy>(&self, id: u16, value: &T) -> Result<(), CoreError> {
        let size = std::mem::size_of::<T>();
        assert!(
            size <= MAX_PAYLOAD,
            "type of size {size} exceeds MAX_PAYLOAD ({MAX_PAYLOAD})"
        );
        // SAFETY: T: Copy guarantees reading its underlying bytes (padding
        // included) is well-defined; those bytes simply travel as payload.
        let bytes =
            unsafe { std::slice::from_raw_parts((value as *const T).cast::<u8>(), size) };
        self.log(id, bytes)
    }

    /// `consumer_open` (spec.md §4.2).
    pub fn consumer_open(&self, filter: Filter) -> Result<usize, CoreError> {
        self.table.open(self.ring.head(), filter)
    }

    /// `consumer_close` (spec.md §4.2).
    pub fn consumer_close(&self, id: usize) {
        self.table.close(id);
    }

    /// `consumer_set_filter` (spec.md §4.2).
    ///
    /// # Safety
    /// The caller must guarantee no thread is concurrently draining `id`.
    pub unsafe fn consumer_set_filter(&self, id: usize, filter: Filter) -> Result<(), CoreError> {
        // SAFETY: forwarded to the caller.
        unsafe { self.table.set_filter(id, filter) }
    }

    /// `consumer_available` (spec.md §4.2).
    pub fn consumer_available(&self, id: usize) -> Result<(u64, u64), CoreError> {
        self.table.available(id, self.ring.head(), self.ring.capacity() as u64)
    }

    /// Total cumulative drops observed by a consumer since it was opened.
    pub fn consumer_dropped_total(&self, id: usize) -> Result<u64, CoreError> {
        self.table.dropped_total(id)
    }

    /// `drain` (spec.md §4.3).
    pub fn drain<F>(&self, id: usize, emit: F) -> Result<usize, CoreError>
    where
        F: FnMut(&DrainedEntry) -> u32,
    {
        drain(&self.ring, &self.table, id, emit)
    }

    /// `drain_packed` (spec.md §4.4).
    pub fn drain_packed(&self, id: usize, buf: &mut [u8]) -> Result<usize, CoreError> {
        drain_packed(&self.ring, &self.table, id, buf)
    }

    /// `schema_serialize` (spec.md §4.6).
    pub fn schema_serialize(&self, buf: Option<&mut [u8]>) -> Result<usize, CoreError> {
        schema_serialize(self, buf)
    }

    /// `schema_stream` (spec.md §4.6).
    pub fn schema_stream<F>(&self, emit: F) -> Result<usize, Aborted>
    where
        F: FnMut(&[u8]) -> u32,
    {
        schema_stream(self, emit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};

    #[test]
    fn log_then_drain_round_trips() {
        let ctx = Context::new(Config::new(16));
        ctx.log(1, b"hello").unwrap();
        let id = ctx.consumer_open(Filter::all()).unwrap();

        let mut seen = Vec::new();
        let emitted = ctx
            .drain(id, |entry| {
                seen.push(entry.payload().to_vec());
                0
            })
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(seen, vec![b"hello".to_vec()]);
    }

    #[test]
    fn log_value_round_trips_a_copy_type() {
        #[derive(Clone, Copy)]
        #[repr(C)]
        struct Sample {
            a: u32,
            b: u32,
        }

        let ctx = Context::new(Config::new(16));
        ctx.log_value(1, &Sample { a: 7, b: 9 }).unwrap();
        let id = ctx.consumer_open(Filter::all()).unwrap();

        let mut decoded = None;
        ctx.drain(id, |entry| {
            let bytes = entry.payload();
            let a = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
            let b = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
            decoded = Some((a, b));
            0
        })
        .unwrap();

        assert_eq!(decoded, Some((7, 9)));
    }

    #[test]
    fn oversized_payload_is_rejected_before_publish() {
        let ctx = Context::new(Config::new(16));
        let oversized = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            ctx.log(1, &oversized),
            Err(CoreError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn schema_round_trips_through_serialize_and_stream() {
        let descriptor = SchemaEntryDescriptor {
            id: 0,
            name: "tick".into(),
            description: "a periodic tick".into(),
            payload_size: 4,
            fields: vec![Field::scalar("count", 0, 4, FieldType::U32)],
        };
        let mut ctx = Context::new(Config::default());
        ctx.register(&descriptor).unwrap();

        let size = ctx.schema_serialize(None).unwrap();
        let mut buf = vec![0u8; size];
        ctx.schema_serialize(Some(&mut buf)).unwrap();

        let mut streamed = Vec::new();
        ctx.schema_stream(|chunk| {
            streamed.extend_from_slice(chunk);
            0
        })
        .unwrap();

        assert_eq!(buf, streamed);
    }
}
