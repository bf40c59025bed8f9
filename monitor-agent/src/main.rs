//! Monitor Agent Binary Entry Point

use clap::Parser;
use monitor_agent::{init_logging, load_agent_config, run_agent, Args};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_agent_config(&args)?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(&config.logging)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received, stopping monitor agent..."),
            Err(e) => {
                tracing::warn!("Cannot listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    if let Err(e) = run_agent(config, shutdown).await {
        tracing::error!("Monitor agent failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
