//! logsift-daemon entry point.
//!
//! Parses CLI arguments, loads and validates configuration, initializes
//! logging and the metrics endpoint, then hands control to the
//! [`Orchestrator`].

use anyhow::Result;
use clap::Parser;

use logsift_core::config::LogsiftConfig;

use logsift_daemon::cli::DaemonCli;
use logsift_daemon::orchestrator::Orchestrator;
use logsift_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = if cli.config.exists() {
        LogsiftConfig::load(&cli.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?
    } else if cli.validate {
        return Err(anyhow::anyhow!(
            "config file not found: {}",
            cli.config.display()
        ));
    } else {
        // Missing config falls back to defaults so the daemon can run
        // out of the box on the in-memory substrate.
        let mut config = LogsiftConfig::default();
        config.apply_env_overrides();
        config
    };

    // CLI overrides take precedence over file and environment
    if let Some(log_level) = cli.log_level {
        config.general.log_level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.general.log_format = log_format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logsift-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        metrics::gauge!(
            logsift_core::metrics::DAEMON_BUILD_INFO,
            "version" => env!("CARGO_PKG_VERSION")
        )
        .set(1.0);
        tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
    }

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await?;

    tracing::info!("logsift-daemon shut down");
    Ok(())
}
