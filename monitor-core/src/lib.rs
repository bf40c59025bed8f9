//! Monitor Core Library
//!
//! This library provides the live-traffic capture log for a proxy: a bounded,
//! concurrency-safe buffer of captured exchanges, the query and statistics
//! layer over it, and the HTTP API a monitoring client consumes.

pub mod api;
/// Bounded capture buffer
pub mod buffer;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod record;
pub mod server;
pub mod stats;

/// Configuration types and utilities
pub mod config;

/// Error types for monitor operations
pub mod error;

pub use api::router;
pub use buffer::{CaptureBuffer, DEFAULT_CAPACITY};
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use filter::{ScopeConfig, ScopeMatcher};
pub use ingest::{spawn_ingest, CaptureSink, IngestTask, DEFAULT_CHANNEL_SIZE};
pub use metrics::{Metrics, MetricsSnapshot};
pub use query::TrafficQuery;
pub use record::{HeaderMap, TrafficRecord};
pub use server::MonitorServer;
pub use stats::{HostCount, TrafficStats, TOP_HOSTS_LIMIT};

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
