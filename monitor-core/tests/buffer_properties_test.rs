//! Capture Buffer Property Tests
//!
//! Property-based checks of the buffer invariants: bounded FIFO retention,
//! monotonic ids across clears, and lookup semantics for absent ids.

use chrono::{DateTime, Utc};
use monitor_core::{CaptureBuffer, HeaderMap, TrafficRecord};
use proptest::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![4 => Just(Op::Add), 1 => Just(Op::Clear)]
}

fn arb_headers() -> impl Strategy<Value = HeaderMap> {
    prop::collection::btree_map(
        "[A-Za-z-]{1,12}",
        prop::collection::vec("[ -~]{0,16}", 1..3),
        0..4,
    )
}

prop_compose! {
    fn arb_record()(
        method in prop::sample::select(vec!["GET", "POST", "PUT", "DELETE", "PATCH"]),
        host in "[a-z]{1,10}\\.(com|net|org)",
        path in "/[a-z0-9/]{0,20}",
        status in prop::option::of(100u16..600),
        request_headers in arb_headers(),
        response_headers in arb_headers(),
        request_body in ".{0,64}",
        response_body in ".{0,64}",
        nanos in 0u64..10_000_000_000,
        tls in prop::sample::select(vec!["", "TLS 1.2", "TLS 1.3"]),
    ) -> TrafficRecord {
        let mut record = TrafficRecord::new(method, format!("https://{}{}", host, path))
            .with_request_headers(request_headers)
            .with_response_headers(response_headers)
            .with_request_body(request_body)
            .with_response_body(response_body)
            .with_duration(Duration::from_nanos(nanos))
            .with_tls_version(tls)
            .with_client_addr("127.0.0.1:50000");
        if let Some(code) = status {
            record = record.with_response(code, "status").with_content_type("text/plain");
        }
        record
    }
}

proptest! {
    /// After N adds the buffer holds exactly the last min(N, capacity)
    /// records, newest first, with consecutive ids.
    #[test]
    fn prop_retains_last_capacity_records(capacity in 1usize..40, adds in 0usize..150) {
        let buffer = CaptureBuffer::new(capacity);
        for i in 0..adds {
            buffer.add(TrafficRecord::new("GET", format!("https://h{}.com/", i)));
        }

        let snapshot = buffer.list();
        let expected: Vec<u64> = (1..=adds as u64).rev().take(capacity).collect();
        let ids: Vec<u64> = snapshot.iter().map(|r| r.id).collect();
        prop_assert_eq!(ids, expected);
        prop_assert!(snapshot.len() <= capacity);
    }

    /// Ids keep increasing by one across any interleaving of adds and clears.
    #[test]
    fn prop_ids_monotonic_across_clears(ops in prop::collection::vec(arb_op(), 1..120)) {
        let buffer = CaptureBuffer::new(16);
        let mut last_id = 0u64;

        for op in ops {
            match op {
                Op::Add => {
                    let id = buffer.add(TrafficRecord::new("GET", "https://example.com/"));
                    prop_assert_eq!(id, last_id + 1);
                    last_id = id;
                }
                Op::Clear => {
                    buffer.clear();
                    prop_assert!(buffer.list().is_empty());
                    prop_assert_eq!(buffer.latest_id(), (last_id > 0).then_some(last_id));
                }
            }
        }
    }

    /// `get` finds exactly the ids present in the snapshot.
    #[test]
    fn prop_get_matches_snapshot(capacity in 1usize..20, adds in 0usize..60, lookup in 0u64..80) {
        let buffer = CaptureBuffer::new(capacity);
        for _ in 0..adds {
            buffer.add(TrafficRecord::new("GET", "https://example.com/"));
        }

        let present = buffer.list().iter().any(|r| r.id == lookup);
        prop_assert_eq!(buffer.get(lookup).is_some(), present);
    }

    /// A record read back before eviction equals what was added, with the
    /// id and capture time assigned by the buffer.
    #[test]
    fn prop_round_trip(record in arb_record()) {
        let buffer = CaptureBuffer::new(4);
        let before = Utc::now();
        let id = buffer.add(record.clone());

        let stored = buffer.get(id).expect("record should still be held");
        prop_assert!(stored.timestamp >= before);
        let mut expected = record;
        expected.id = id;
        expected.timestamp = stored.timestamp;
        prop_assert_eq!(stored, expected);
    }

    /// Timestamps never decrease as ids increase.
    #[test]
    fn prop_timestamps_follow_ids(capacity in 1usize..20, adds in 1usize..60) {
        let buffer = CaptureBuffer::new(capacity);
        for i in 0..adds {
            let mut record = TrafficRecord::new("GET", format!("https://h{}.com/", i));
            record.timestamp = DateTime::<Utc>::UNIX_EPOCH;
            buffer.add(record);
        }

        let snapshot = buffer.list();
        prop_assert!(snapshot.windows(2).all(|w| w[0].id > w[1].id && w[0].timestamp >= w[1].timestamp));
        prop_assert!(snapshot.iter().all(|r| r.timestamp > DateTime::<Utc>::UNIX_EPOCH));
    }
}
