//! Shared harness for the end-to-end tests

use monitor_agent::MonitorAgent;
use monitor_core::{CaptureBuffer, CaptureSink, MonitorConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A monitor agent serving on an ephemeral local port
pub struct RunningMonitor {
    pub addr: SocketAddr,
    pub sink: CaptureSink,
    pub buffer: Arc<CaptureBuffer>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<monitor_core::Result<()>>,
}

impl RunningMonitor {
    /// Start an agent with `config`, overriding the port with one picked by the OS
    pub async fn start(config: MonitorConfig) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt::try_init();

        let config = MonitorConfig {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 0,
            ..config
        };

        let agent = MonitorAgent::new(config)?;
        let listener = agent.bind().await?;
        let addr = listener.local_addr()?;
        let sink = agent.sink();
        let buffer = agent.buffer();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(agent.serve(listener, async move {
            let _ = rx.await;
        }));

        Ok(Self {
            addr,
            sink,
            buffer,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server to stop
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await??;
        Ok(())
    }
}

/// Poll `condition` every 10ms for up to two seconds
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
