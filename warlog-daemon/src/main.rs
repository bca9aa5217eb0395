//! warlog-daemon entry point.
//!
//! Loads configuration, wires HTTP sources into the log collector and
//! runs it until SIGINT or SIGTERM. One-shot flags (`--validate`,
//! `--stats`, `--cleanup-days`) perform their action and exit without
//! starting the collection loops.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use metrics::gauge;

use warlog_collector::{CollectorConfig, LogCollector};
use warlog_core::config::WarlogConfig;
use warlog_core::metrics::DAEMON_UPTIME_SECONDS;
use warlog_core::pipeline::Pipeline;

use warlog_daemon::cli::DaemonCli;
use warlog_daemon::logging::init_tracing;
use warlog_daemon::metrics_server::install_metrics_recorder;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = WarlogConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // CLI flags win over config file and environment
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    // One-shot commands print to stdout; keep log noise out of their output
    if cli.is_one_shot() && cli.log_level.is_none() {
        config.general.log_level = "warn".to_owned();
    }
    config.validate().context("invalid configuration")?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(
        config = %cli.config.display(),
        servers = config.enabled_servers().count(),
        "warlog-daemon starting"
    );

    let collector = LogCollector::builder()
        .config(CollectorConfig::from_core(&config))
        .with_http_sources(&config)
        .map_err(|e| anyhow::anyhow!("failed to create log sources: {}", e))?
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build log collector: {}", e))?;

    if cli.stats {
        let stats = collector
            .statistics()
            .await
            .map_err(|e| anyhow::anyhow!("failed to collect statistics: {}", e))?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if let Some(days) = cli.cleanup_days {
        let removed = collector
            .cleanup(days)
            .await
            .map_err(|e| anyhow::anyhow!("cleanup failed: {}", e))?;
        println!("removed {removed} expired log files (kept last {days} days)");
        return Ok(());
    }

    if config.metrics.enabled {
        install_metrics_recorder(&config.metrics)?;
    }

    run(collector).await
}

/// Run the collector until a shutdown signal arrives.
async fn run(mut collector: LogCollector) -> Result<()> {
    let started = Instant::now();
    collector
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start log collector: {}", e))?;
    tracing::info!("log collector started");

    let uptime_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
        loop {
            interval.tick().await;
            gauge!(DAEMON_UPTIME_SECONDS).set(started.elapsed().as_secs_f64());
        }
    });

    wait_for_shutdown().await?;
    tracing::info!("shutdown signal received");
    uptime_task.abort();

    // Stop performs the final flush and disconnects all sessions
    if let Err(e) = collector.stop().await {
        tracing::error!(error = %e, "failed to stop log collector cleanly");
    }

    tracing::info!("warlog-daemon shut down");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to wait for SIGINT")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for SIGINT")
}
