use crate::{
    api::router,
    buffer::CaptureBuffer,
    config::MonitorConfig,
    error::MonitorError,
    filter::ScopeMatcher,
    ingest::{spawn_ingest, CaptureSink, IngestTask},
    Result,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Owns the shared capture buffer and serves the monitor API over it
pub struct MonitorServer {
    config: MonitorConfig,
    buffer: Arc<CaptureBuffer>,
}

impl MonitorServer {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let buffer = CaptureBuffer::new_shared(config.capacity);
        Ok(Self { config, buffer })
    }

    /// Handle to hand to producers that call `add` directly
    pub fn buffer(&self) -> Arc<CaptureBuffer> {
        self.buffer.clone()
    }

    /// Start the ingest task configured for this server
    pub fn spawn_ingest(&self) -> (CaptureSink, IngestTask) {
        spawn_ingest(
            self.buffer.clone(),
            ScopeMatcher::from_config(&self.config.scope),
            self.config.ingest_channel_size,
        )
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.socket_addr()?;
        TcpListener::bind(addr).await.map_err(|e| {
            MonitorError::Network(format!("Failed to bind monitor port {}: {}", addr.port(), e))
        })
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!(
            "Starting monitor API on http://{} (capacity={})",
            addr, self.config.capacity
        );

        axum::serve(listener, router(self.buffer))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MonitorError::Network(format!("Monitor server failed: {}", e)))?;

        info!("Monitor API stopped");
        Ok(())
    }
}
