use monitor_core::MonitorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the monitor agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to enable JSON formatted logs
    pub json_format: bool,

    /// Whether to include thread names in logs
    pub include_thread_names: bool,

    /// Whether to include file and line number information
    pub include_file_info: bool,

    /// Whether to enable colored output (only for non-JSON format)
    pub enable_colors: bool,

    /// Log file path (optional, if None logs only to stdout)
    pub log_file: Option<String>,

    /// Module-specific log levels
    pub module_levels: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_levels = BTreeMap::new();
        module_levels.insert("monitor_core".to_string(), "info".to_string());
        module_levels.insert("monitor_agent".to_string(), "info".to_string());
        module_levels.insert("tower_http".to_string(), "info".to_string());
        module_levels.insert("hyper".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            include_thread_names: true,
            include_file_info: false,
            enable_colors: true,
            log_file: None,
            module_levels,
        }
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured levels apply
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, MonitorError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(directive.parse().map_err(|e| {
            MonitorError::Configuration(format!("Invalid log directive '{}': {}", directive, e))
        })?);
    }
    Ok(filter)
}

/// Initialize logging based on the provided configuration.
///
/// The returned guard flushes the log file on drop and must be kept alive for
/// as long as file logging is wanted. Initializing twice is not an error.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, MonitorError> {
    if !levels::is_valid_level(&config.level) {
        return Err(MonitorError::Configuration(format!(
            "Invalid log level '{}', expected one of {:?}",
            config.level,
            levels::valid_levels()
        )));
    }

    let filter = build_filter(config)?;

    let (file_layer, guard) = match &config.log_file {
        Some(log_file) => {
            let appender = create_file_appender(log_file)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let result = if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_thread_names(config.include_thread_names)
                    .with_file(config.include_file_info)
                    .with_line_number(config.include_file_info),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(config.include_thread_names)
                    .with_file(config.include_file_info)
                    .with_line_number(config.include_file_info)
                    .with_ansi(config.enable_colors),
            )
            .try_init()
    };

    match result {
        Ok(_) => tracing::info!("Logging initialized with config level: {}", config.level),
        Err(_) => tracing::debug!("Logging already initialized, skipping"),
    }

    Ok(guard)
}

/// Create a daily-rotating file appender for `log_file`
fn create_file_appender(log_file: &str) -> Result<RollingFileAppender, MonitorError> {
    let log_path = Path::new(log_file);
    let directory = match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let filename = log_path
        .file_name()
        .ok_or_else(|| MonitorError::Configuration("Invalid log file name".to_string()))?
        .to_string_lossy();

    std::fs::create_dir_all(directory).map_err(|e| {
        MonitorError::Configuration(format!("Failed to create log directory: {}", e))
    })?;

    Ok(RollingFileAppender::new(
        Rotation::DAILY,
        directory,
        filename.as_ref(),
    ))
}

/// Log level utilities
pub mod levels {
    /// Check if a log level string is valid
    pub fn is_valid_level(level: &str) -> bool {
        matches!(
            level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        )
    }

    /// Get all valid log levels
    pub fn valid_levels() -> Vec<&'static str> {
        vec!["trace", "debug", "info", "warn", "error"]
    }
}
