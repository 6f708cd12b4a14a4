// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Vigil Agent
//!
//! Long-running process on every monitored host. Locates the controller
//! (directly or via consul), streams heartbeats, and executes pushed
//! scripts.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use vigil_agent::supervisor::{self, AgentConfig};

/// Vigil agent - host telemetry and script execution
#[derive(Parser)]
#[command(name = "vigil-agent")]
#[command(version, about, long_about = None)]
struct Args {
    /// Controller gRPC endpoint (host:port); bypasses discovery
    #[arg(long, env = "VIGIL_CONTROLLER_URL")]
    controller_url: Option<String>,

    /// Consul HTTP address used to discover the controller
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    consul: Option<String>,

    /// Seconds between heartbeats
    #[arg(long, env = "VIGIL_REPORT_INTERVAL", default_value = "10")]
    report_interval: u64,

    /// Seconds to wait before reconnecting after a session failure
    #[arg(long, env = "VIGIL_RETRY_DELAY", default_value = "5")]
    retry_delay: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VIGIL_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.controller_url.is_none() && args.consul.is_none() {
        bail!("Either --controller-url or --consul must be set");
    }

    info!("Starting vigil agent");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let config = AgentConfig {
        controller_url: args.controller_url,
        consul_addr: args.consul,
        report_interval: Duration::from_secs(args.report_interval),
        retry_delay: Duration::from_secs(args.retry_delay),
    };

    supervisor::run(config, shutdown_rx).await?;

    info!("Agent stopped");
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
