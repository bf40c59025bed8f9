//! Summary statistics over a capture buffer snapshot
//!
//! All counts in a `TrafficStats` come from the same `list()` snapshot, so
//! they always agree with each other and with `total`.

use crate::buffer::CaptureBuffer;
use crate::record::TrafficRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Maximum number of hosts reported in `TrafficStats::hosts`
pub const TOP_HOSTS_LIMIT: usize = 10;

/// Aggregate view of the captured traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStats {
    pub total: usize,
    pub methods: BTreeMap<String, usize>,
    /// Keyed by status code; exchanges without a response are not counted
    pub status_codes: BTreeMap<u16, usize>,
    /// Busiest hosts, most requests first
    pub hosts: Vec<HostCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCount {
    pub host: String,
    pub count: usize,
}

impl TrafficStats {
    /// Compute statistics from a single snapshot of `buffer`
    pub fn collect(buffer: &CaptureBuffer) -> Self {
        Self::from_records(&buffer.list())
    }

    pub fn from_records(records: &[TrafficRecord]) -> Self {
        Self {
            total: records.len(),
            methods: count_by_method(records),
            status_codes: count_by_status_code(records),
            hosts: top_hosts(records, TOP_HOSTS_LIMIT),
        }
    }
}

pub fn count_by_method(records: &[TrafficRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.method.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_status_code(records: &[TrafficRecord]) -> BTreeMap<u16, usize> {
    let mut counts = BTreeMap::new();
    for record in records.iter().filter(|r| r.has_response()) {
        *counts.entry(record.status_code).or_insert(0) += 1;
    }
    counts
}

/// Hosts ordered by descending request count, ties by host name ascending
pub fn top_hosts(records: &[TrafficRecord], limit: usize) -> Vec<HostCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.host.as_str()).or_insert(0) += 1;
    }

    let mut hosts: Vec<HostCount> = counts
        .into_iter()
        .map(|(host, count)| HostCount {
            host: host.to_string(),
            count,
        })
        .collect();
    hosts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.host.cmp(&b.host)));
    hosts.truncate(limit);
    hosts
}
