//! Monitor Agent
//!
//! Standalone process hosting the traffic monitor. Loads configuration from
//! defaults, an optional TOML file, `MONITOR_*` environment variables and the
//! command line (later sources win), then serves the monitor API.

use clap::Parser;
use monitor_core::{
    CaptureBuffer, CaptureSink, IngestTask, MonitorConfig, MonitorError, MonitorServer, Result,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod logging;
pub use logging::{init_logging, LoggingConfig};


#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Address the monitor API listens on
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Port the monitor API listens on
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of records kept in the capture buffer
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Number of records that may queue between producers and the buffer
    #[arg(long)]
    pub channel_size: Option<usize>,

    /// Host pattern to capture (repeatable, wildcards allowed)
    #[arg(long = "allow")]
    pub allow: Vec<String>,

    /// Host pattern never to capture (repeatable, wildcards allowed)
    #[arg(long = "block")]
    pub block: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Also write logs to this file (rotated daily)
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Everything the agent reads at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

/// Resolve the agent configuration from every source.
pub fn load_agent_config(args: &Args) -> Result<AgentConfig> {
    load_agent_config_with(args, |key| std::env::var(key).ok())
}

/// Same as [`load_agent_config`], reading variables through `var`
fn load_agent_config_with<F>(args: &Args, var: F) -> Result<AgentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => AgentConfig::default(),
    };

    apply_env_overrides(&mut config, var)?;
    apply_cli_overrides(&mut config, args);

    config.monitor.validate()?;
    if !logging::levels::is_valid_level(&config.logging.level) {
        return Err(MonitorError::Configuration(format!(
            "Invalid log level '{}'",
            config.logging.level
        )));
    }

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<AgentConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MonitorError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    toml::from_str(&contents).map_err(|e| {
        MonitorError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Apply `MONITOR_*` variables looked up through `var`
fn apply_env_overrides<F>(config: &mut AgentConfig, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = var("MONITOR_LISTEN_ADDRESS") {
        config.monitor.listen_address = addr;
    }
    if let Some(port) = var("MONITOR_PORT") {
        config.monitor.listen_port = parse_env("MONITOR_PORT", &port)?;
    }
    if let Some(capacity) = var("MONITOR_CAPACITY") {
        config.monitor.capacity = parse_env("MONITOR_CAPACITY", &capacity)?;
    }
    if let Some(size) = var("MONITOR_CHANNEL_SIZE") {
        config.monitor.ingest_channel_size = parse_env("MONITOR_CHANNEL_SIZE", &size)?;
    }
    if let Some(allow) = var("MONITOR_SCOPE_ALLOW") {
        config.monitor.scope.allow = split_patterns(&allow);
    }
    if let Some(block) = var("MONITOR_SCOPE_BLOCK") {
        config.monitor.scope.block = split_patterns(&block);
    }
    if let Some(level) = var("MONITOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut AgentConfig, args: &Args) {
    if let Some(addr) = &args.listen_addr {
        config.monitor.listen_address = addr.clone();
    }
    if let Some(port) = args.port {
        config.monitor.listen_port = port;
    }
    if let Some(capacity) = args.capacity {
        config.monitor.capacity = capacity;
    }
    if let Some(size) = args.channel_size {
        config.monitor.ingest_channel_size = size;
    }
    if !args.allow.is_empty() {
        config.monitor.scope.allow = args.allow.clone();
    }
    if !args.block.is_empty() {
        config.monitor.scope.block = args.block.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.log_json {
        config.logging.json_format = true;
    }
    if let Some(file) = &args.log_file {
        config.logging.log_file = Some(file.clone());
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        MonitorError::Configuration(format!("Invalid value '{}' for {}: {}", value, key, e))
    })
}

fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// A running monitor: the shared buffer, its ingest task, and the API server
pub struct MonitorAgent {
    server: MonitorServer,
    sink: CaptureSink,
    ingest: IngestTask,
}

impl MonitorAgent {
    /// Create the buffer and start the ingest task. Must run inside a Tokio runtime.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let server = MonitorServer::new(config)?;
        let (sink, ingest) = server.spawn_ingest();
        Ok(Self {
            server,
            sink,
            ingest,
        })
    }

    /// Producer handle for in-process interception code
    pub fn sink(&self) -> CaptureSink {
        self.sink.clone()
    }

    pub fn buffer(&self) -> Arc<CaptureBuffer> {
        self.server.buffer()
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        self.server.bind().await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain and stop ingest
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            server,
            sink,
            ingest,
        } = self;

        let result = server.serve(listener, shutdown).await;

        drop(sink);
        ingest.shutdown().await;
        result
    }
}

/// Run the agent with a resolved configuration until `shutdown` resolves
pub async fn run_agent<F>(config: AgentConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting Monitor Agent...");
    tracing::info!(
        "  Listen:   {}:{}",
        config.monitor.listen_address,
        config.monitor.listen_port
    );
    tracing::info!("  Capacity: {}", config.monitor.capacity);
    if !config.monitor.scope.allow.is_empty() || !config.monitor.scope.block.is_empty() {
        tracing::info!(
            "  Scope:    allow={:?} block={:?}",
            config.monitor.scope.allow,
            config.monitor.scope.block
        );
    }

    let agent = MonitorAgent::new(config.monitor)?;
    let listener = agent.bind().await?;
    agent.serve(listener, shutdown).await
}
