//! Bounded capture buffer
//!
//! Holds the most recent `capacity` traffic records in a ring buffer. Record
//! identities come from a counter that lives for the whole buffer lifetime and
//! is never reset, so ids are not reused after eviction or `clear`.
//!
//! The record sequence and the id counter sit behind one `RwLock`: `add` and
//! `clear` take the write side, `list` and `get` share the read side, so every
//! read observes a whole number of completed adds.

use crate::metrics::{Metrics, MetricsSnapshot};
use crate::record::TrafficRecord;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of records kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct BufferState {
    records: VecDeque<TrafficRecord>,
    next_id: u64,
}

/// Thread-safe, fixed-capacity store of captured traffic
#[derive(Debug)]
pub struct CaptureBuffer {
    state: RwLock<BufferState>,
    capacity: usize,
    metrics: Arc<Metrics>,
}

impl CaptureBuffer {
    /// Create a buffer holding at most `capacity` records (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_metrics(capacity, Arc::new(Metrics::default()))
    }

    /// Create a buffer that reports into an existing metrics handle
    pub fn with_metrics(capacity: usize, metrics: Arc<Metrics>) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(BufferState {
                records: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            capacity,
            metrics,
        }
    }

    /// Create as shared Arc
    pub fn new_shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    /// Store a record, returning the id assigned to it.
    ///
    /// The record's `id` and `timestamp` are overwritten here, under the write
    /// lock, so timestamps never go backwards as ids increase. When the buffer
    /// is full the oldest record is evicted first.
    pub fn add(&self, mut record: TrafficRecord) -> u64 {
        let mut evicted = 0u64;
        let id = {
            let mut state = self.state.write();
            let id = state.next_id;
            state.next_id += 1;
            record.id = id;
            record.timestamp = Utc::now();

            while state.records.len() >= self.capacity {
                state.records.pop_front();
                evicted += 1;
            }
            state.records.push_back(record);
            id
        };

        self.metrics.records_added.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.metrics
                .records_evicted
                .fetch_add(evicted, Ordering::Relaxed);
            debug!(id, evicted, capacity = self.capacity, "Evicted oldest records");
        }

        id
    }

    /// Point-in-time copy of every held record, newest first
    pub fn list(&self) -> Vec<TrafficRecord> {
        let state = self.state.read();
        state.records.iter().rev().cloned().collect()
    }

    /// Look up a record by id.
    ///
    /// Returns `None` both for ids never assigned and for ids already evicted.
    pub fn get(&self, id: u64) -> Option<TrafficRecord> {
        let state = self.state.read();
        // ids are pushed in increasing order, so the deque stays sorted by id
        state
            .records
            .binary_search_by_key(&id, |record| record.id)
            .ok()
            .and_then(|index| state.records.get(index).cloned())
    }

    /// Discard every held record. The id counter keeps counting.
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut state = self.state.write();
            let cleared = state.records.len();
            state.records.clear();
            cleared
        };

        self.metrics
            .records_cleared
            .fetch_add(cleared as u64, Ordering::Relaxed);
        info!(cleared, "Capture buffer cleared");
        cleared
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Last id handed out, if any record was ever added
    pub fn latest_id(&self) -> Option<u64> {
        let next_id = self.state.read().next_id;
        (next_id > 1).then(|| next_id - 1)
    }

    /// Shared counters this buffer reports into
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Counters together with the current occupancy
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let (buffered, latest_id) = {
            let state = self.state.read();
            (state.records.len(), (state.next_id > 1).then(|| state.next_id - 1))
        };
        self.metrics.snapshot(buffered, self.capacity, latest_id)
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
