//! Lifetime counters for the capture pipeline

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared state for metrics
#[derive(Debug, Default)]
pub struct Metrics {
    pub records_added: AtomicU64,
    pub records_evicted: AtomicU64,
    pub records_cleared: AtomicU64,
    // Ingest channel
    pub ingest_dropped: AtomicU64,
    pub scope_filtered: AtomicU64,
}

/// Serializable view of `Metrics` plus the buffer's current occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub records_added: u64,
    pub records_evicted: u64,
    pub records_cleared: u64,
    pub ingest_dropped: u64,
    pub scope_filtered: u64,
    pub buffered: usize,
    pub capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_id: Option<u64>,
}

impl Metrics {
    pub fn snapshot(&self, buffered: usize, capacity: usize, latest_id: Option<u64>) -> MetricsSnapshot {
        MetricsSnapshot {
            records_added: self.records_added.load(Ordering::Relaxed),
            records_evicted: self.records_evicted.load(Ordering::Relaxed),
            records_cleared: self.records_cleared.load(Ordering::Relaxed),
            ingest_dropped: self.ingest_dropped.load(Ordering::Relaxed),
            scope_filtered: self.scope_filtered.load(Ordering::Relaxed),
            buffered,
            capacity,
            latest_id,
        }
    }
}
