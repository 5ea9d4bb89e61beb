//! Property-based tests for the testable properties in spec.md §8.

use proptest::prelude::*;
use telemetry_core::{Config, Context, Filter};

/// INV: a consumer never sees more entries than were actually logged while
/// it was open, and never sees them out of order.
proptest! {
    #[test]
    fn drain_never_exceeds_what_was_logged_and_preserves_order(
        payloads in prop::collection::vec(0u8..=255, 1..40),
    ) {
        let ctx = Context::new(Config::new(64));
        let id = ctx.consumer_open(Filter::all()).unwrap();

        for &p in &payloads {
            ctx.log(0, &[p]).unwrap();
        }

        let mut seen = Vec::new();
        let emitted = ctx.drain(id, |entry| {
            seen.push(entry.payload()[0]);
            0
        }).unwrap();

        prop_assert!(emitted <= payloads.len());
        prop_assert_eq!(&seen, &payloads[..seen.len()]);
    }
}

/// INV: `consumer_available`'s `available` count never exceeds the ring's
/// capacity, regardless of how far a producer has lapped the consumer.
proptest! {
    #[test]
    fn available_never_exceeds_capacity(
        logs in 0usize..500,
    ) {
        let ctx = Context::new(Config::new(16));
        let id = ctx.consumer_open(Filter::all()).unwrap();

        for i in 0..logs {
            ctx.log(0, &(i as u32).to_ne_bytes()).unwrap();
        }

        let (available, _pending) = ctx.consumer_available(id).unwrap();
        prop_assert!(available <= 16);
    }
}

/// INV: a filter that accepts only one id never lets a different id through
/// a drain.
proptest! {
    #[test]
    fn filter_never_admits_a_rejected_id(
        ids in prop::collection::vec(0u16..4, 1..40),
    ) {
        let ctx = Context::new(Config::new(64));
        let id = ctx.consumer_open(Filter::accepting([1])).unwrap();

        for &schema_id in &ids {
            ctx.log(schema_id, &[]).unwrap();
        }

        let mut seen_ids = Vec::new();
        ctx.drain(id, |entry| {
            seen_ids.push(entry.id);
            0
        }).unwrap();

        prop_assert!(seen_ids.iter().all(|&i| i == 1));
    }
}

/// INV: the packed-batch drain and the callback drain agree on which
/// entries exist, in the same order, when both start from the same cursor.
proptest! {
    #[test]
    fn packed_and_callback_drains_agree(
        payload_sizes in prop::collection::vec(0usize..16, 1..20),
    ) {
        let ctx = Context::new(Config::new(64));
        let callback_id = ctx.consumer_open(Filter::all()).unwrap();
        let packed_id = ctx.consumer_open(Filter::all()).unwrap();

        for (i, size) in payload_sizes.iter().enumerate() {
            let payload = vec![(i % 256) as u8; *size];
            ctx.log(0, &payload).unwrap();
        }

        let mut callback_payloads = Vec::new();
        ctx.drain(callback_id, |entry| {
            callback_payloads.push(entry.payload().to_vec());
            0
        }).unwrap();

        let mut buf = vec![0u8; 8192];
        let len = ctx.drain_packed(packed_id, &mut buf).unwrap();
        prop_assert!(len <= buf.len());

        let header = telemetry_core::PacketHeader::decode(&buf[..telemetry_core::PacketHeader::SIZE]);
        prop_assert_eq!(header.entry_count as usize, callback_payloads.len());
    }
}
