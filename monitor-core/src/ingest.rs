//! Producer-facing ingest channel
//!
//! Interception code should never wait on the monitor. A `CaptureSink` hands
//! records to a bounded channel with `try_send`; when the channel is full the
//! record is dropped and counted. A single ingest task drains the channel,
//! applies the capture scope, and adds the survivors to the buffer.

use crate::buffer::CaptureBuffer;
use crate::filter::ScopeMatcher;
use crate::metrics::Metrics;
use crate::record::TrafficRecord;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Default number of records that may wait in the ingest channel
pub const DEFAULT_CHANNEL_SIZE: usize = 1024;

/// Cloneable producer handle into the ingest channel
#[derive(Debug, Clone)]
pub struct CaptureSink {
    sender: mpsc::Sender<TrafficRecord>,
    metrics: Arc<Metrics>,
}

impl CaptureSink {
    /// Queue a record for capture without blocking.
    ///
    /// Returns `false` if the record was dropped because the channel is full
    /// or the ingest task has stopped.
    pub fn capture(&self, record: TrafficRecord) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                self.metrics.ingest_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Ingest channel full, dropping capture of {} {}", record.method, record.url);
                false
            }
            Err(TrySendError::Closed(record)) => {
                self.metrics.ingest_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Ingest task stopped, dropping capture of {} {}", record.method, record.url);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Handle to the running ingest task
#[derive(Debug)]
pub struct IngestTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl IngestTask {
    /// Close the channel, ingest every record already queued, and wait for
    /// the task to exit. Later captures on outstanding sinks are dropped and
    /// counted.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!("Ingest task failed: {}", e);
        }
    }
}

/// Start the ingest task for `buffer`.
///
/// The task runs until every `CaptureSink` clone has been dropped or
/// `IngestTask::shutdown` is called.
pub fn spawn_ingest(
    buffer: Arc<CaptureBuffer>,
    scope: ScopeMatcher,
    channel_size: usize,
) -> (CaptureSink, IngestTask) {
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let (stop_tx, stop_rx) = oneshot::channel();
    let sink = CaptureSink {
        sender: tx,
        metrics: buffer.metrics().clone(),
    };
    let handle = tokio::spawn(run_ingest(rx, stop_rx, buffer, scope));
    (
        sink,
        IngestTask {
            stop: stop_tx,
            handle,
        },
    )
}

async fn run_ingest(
    mut rx: mpsc::Receiver<TrafficRecord>,
    mut stop: oneshot::Receiver<()>,
    buffer: Arc<CaptureBuffer>,
    scope: ScopeMatcher,
) {
    info!(
        "Ingest task started (capacity={}, scope={})",
        buffer.capacity(),
        if scope.is_unrestricted() { "unrestricted" } else { "restricted" }
    );

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(record) => ingest(&buffer, &scope, record),
                None => {
                    info!("Ingest channel closed, ingest task exiting");
                    return;
                }
            },
            _ = &mut stop => break,
        }
    }

    // No new records are accepted once closed; queued ones are still delivered
    rx.close();
    let mut drained = 0usize;
    while let Some(record) = rx.recv().await {
        ingest(&buffer, &scope, record);
        drained += 1;
    }
    info!(drained, "Ingest task stopped");
}

fn ingest(buffer: &CaptureBuffer, scope: &ScopeMatcher, record: TrafficRecord) {
    if !scope.is_allowed(&record.host) {
        buffer
            .metrics()
            .scope_filtered
            .fetch_add(1, Ordering::Relaxed);
        trace!("Out of scope, not captured: {}", record.host);
        return;
    }

    let id = buffer.add(record);
    debug!(id, "Captured traffic record");
}
