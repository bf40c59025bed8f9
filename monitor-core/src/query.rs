//! Request/response view of the capture buffer
//!
//! `TrafficQuery` is what API handlers talk to. Lookups never distinguish
//! between an id that was never issued and one that has been evicted.

use crate::buffer::CaptureBuffer;
use crate::error::MonitorError;
use crate::record::TrafficRecord;
use crate::stats::TrafficStats;
use crate::Result;
use axum::http::Method;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TrafficQuery {
    buffer: Arc<CaptureBuffer>,
}

impl TrafficQuery {
    pub fn new(buffer: Arc<CaptureBuffer>) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &Arc<CaptureBuffer> {
        &self.buffer
    }

    /// Every held record, newest first, unfiltered
    pub fn list_all(&self) -> Vec<TrafficRecord> {
        self.buffer.list()
    }

    /// Resolve a caller-supplied id token to a record
    pub fn get_one(&self, token: &str) -> Result<TrafficRecord> {
        let id: u64 = token.trim().parse().map_err(|_| {
            debug!(token, "Unparseable record id");
            MonitorError::NotFound(token.to_string())
        })?;

        self.buffer
            .get(id)
            .ok_or_else(|| MonitorError::NotFound(token.to_string()))
    }

    /// Clear the buffer. Only a POST may do this.
    pub fn clear(&self, method: &Method) -> Result<usize> {
        if *method != Method::POST {
            return Err(MonitorError::MethodNotAllowed(method.to_string()));
        }
        Ok(self.buffer.clear())
    }

    pub fn stats(&self) -> TrafficStats {
        TrafficStats::collect(&self.buffer)
    }
}
