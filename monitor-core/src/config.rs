//! Configuration types and utilities

use crate::buffer::DEFAULT_CAPACITY;
use crate::error::MonitorError;
use crate::filter::ScopeConfig;
use crate::ingest::DEFAULT_CHANNEL_SIZE;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Monitor startup configuration
///
/// These settings are read once at startup and do not change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Address the monitor API listens on
    pub listen_address: String,
    /// Port the monitor API listens on
    pub listen_port: u16,
    /// Maximum number of records kept in the capture buffer
    pub capacity: usize,
    /// Number of records that may queue between producers and the buffer
    pub ingest_channel_size: usize,
    /// Capture scope applied by the ingest task
    pub scope: ScopeConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8081,
            capacity: DEFAULT_CAPACITY,
            ingest_channel_size: DEFAULT_CHANNEL_SIZE,
            scope: ScopeConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Check that the configuration can be used to start a monitor
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.capacity == 0 {
            return Err(MonitorError::Configuration(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.ingest_channel_size == 0 {
            return Err(MonitorError::Configuration(
                "ingest_channel_size must be at least 1".to_string(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Socket address built from `listen_address` and `listen_port`
    pub fn socket_addr(&self) -> Result<SocketAddr, MonitorError> {
        let ip: IpAddr = self.listen_address.parse().map_err(|e| {
            MonitorError::Configuration(format!(
                "Invalid listen address '{}': {}",
                self.listen_address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}
