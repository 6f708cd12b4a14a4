// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Vigil Controller
//!
//! Central control-plane process: accepts agent streams over gRPC, serves
//! the operator read API over HTTP, runs the maintenance sweeps, and
//! (optionally) registers both endpoints with consul.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use vigil_controller::application::{
    run_maintenance, MaintenanceConfig, ScriptDispatcher, StreamRegistry,
};
use vigil_controller::infrastructure::repositories::{
    SqliteHostRepository, SqliteScriptRepository, SqliteTagRepository,
};
use vigil_controller::infrastructure::Database;
use vigil_controller::presentation::api::{self, AppState};
use vigil_controller::presentation::grpc::CollectorService;
use vigil_discovery::{ConsulClient, ServiceCheck, ServiceRegistration};

const GRPC_SERVICE_ID: &str = "vigil-controller";
const HTTP_SERVICE_ID: &str = "vigil-controller-http";

/// Vigil controller - fleet telemetry and script distribution
#[derive(Parser)]
#[command(name = "vigil-controller")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port for the agent gRPC stream endpoint
    #[arg(long, env = "VIGIL_GRPC_PORT", default_value = "9090")]
    grpc_port: u16,

    /// Port for the operator HTTP API
    #[arg(long, env = "VIGIL_HTTP_PORT", default_value = "8080")]
    http_port: u16,

    /// Path to the SQLite database file
    #[arg(long, env = "VIGIL_DB_PATH", default_value = "/data/vigil.db")]
    db_path: String,

    /// Seconds without a heartbeat before a host is marked offline
    #[arg(long, env = "VIGIL_INACTIVE_TIMEOUT", default_value = "60")]
    inactive_timeout: u64,

    /// Seconds between inactivity sweeps
    #[arg(long, env = "VIGIL_SWEEP_INTERVAL", default_value = "10")]
    sweep_interval: u64,

    /// Seconds between usage retention sweeps
    #[arg(long, env = "VIGIL_CLEANUP_INTERVAL", default_value = "300")]
    cleanup_interval: u64,

    /// Days of usage history to retain
    #[arg(long, env = "VIGIL_RETENTION_DAYS", default_value = "7")]
    retention_days: u64,

    /// Consul HTTP address; when set, both endpoints are registered
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    consul: Option<String>,

    /// Address advertised to consul (defaults to the local non-loopback IP)
    #[arg(long, env = "VIGIL_ADVERTISE_ADDR")]
    advertise_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VIGIL_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let db = Database::open(&args.db_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", args.db_path))?;

    let hosts = Arc::new(SqliteHostRepository::new(db.pool().clone()));
    let scripts = Arc::new(SqliteScriptRepository::new(db.pool().clone()));
    let tags = Arc::new(SqliteTagRepository::new(db.pool().clone()));

    let registry = Arc::new(StreamRegistry::new());
    let dispatcher = Arc::new(ScriptDispatcher::new(registry.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(watch_signals(shutdown_tx));

    let maintenance = MaintenanceConfig {
        sweep_interval: std::time::Duration::from_secs(args.sweep_interval),
        inactive_timeout: chrono::Duration::seconds(args.inactive_timeout as i64),
        cleanup_interval: std::time::Duration::from_secs(args.cleanup_interval),
        retention_period: chrono::Duration::days(args.retention_days as i64),
    };
    tokio::spawn(run_maintenance(
        hosts.clone(),
        maintenance,
        shutdown_rx.clone(),
    ));

    let collector =
        CollectorService::new(hosts.clone(), scripts.clone(), registry.clone()).into_server();
    let grpc_addr: SocketAddr = ([0, 0, 0, 0], args.grpc_port).into();
    let mut grpc_shutdown = shutdown_rx.clone();
    let grpc_server = tokio::spawn(async move {
        info!("gRPC server listening on {grpc_addr}");
        tonic::transport::Server::builder()
            .add_service(collector)
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_shutdown.changed().await;
            })
            .await
    });

    let state = Arc::new(AppState {
        db,
        hosts,
        scripts,
        tags,
        dispatcher,
    });
    let http_addr: SocketAddr = ([0, 0, 0, 0], args.http_port).into();
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {http_addr}"))?;
    let mut http_shutdown = shutdown_rx.clone();
    let http_server = tokio::spawn(async move {
        info!("HTTP API server listening on {http_addr}");
        axum::serve(listener, api::app(state))
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.changed().await;
            })
            .await
    });

    let consul = args.consul.as_ref().map(ConsulClient::new);
    if let Some(consul) = &consul {
        if let Err(e) = register_with_consul(consul, &args).await {
            warn!(error = %e, "Failed to register with consul");
        }
    }

    let (grpc_result, http_result) = tokio::try_join!(grpc_server, http_server)?;
    grpc_result.context("gRPC server error")?;
    http_result.context("HTTP server error")?;

    if let Some(consul) = &consul {
        for service_id in [GRPC_SERVICE_ID, HTTP_SERVICE_ID] {
            if let Err(e) = consul.deregister(service_id).await {
                warn!(service_id, error = %e, "Failed to deregister service");
            }
        }
    }

    info!("Controller stopped");
    Ok(())
}

async fn register_with_consul(consul: &ConsulClient, args: &Args) -> Result<()> {
    let address = match &args.advertise_addr {
        Some(addr) => addr.clone(),
        None => local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string()),
    };

    consul
        .register(&ServiceRegistration {
            id: GRPC_SERVICE_ID.to_string(),
            name: GRPC_SERVICE_ID.to_string(),
            address: address.clone(),
            port: args.grpc_port,
            tags: vec!["metrics".into(), "controller".into(), "grpc".into()],
            check: ServiceCheck::grpc(format!("{address}:{}", args.grpc_port)),
        })
        .await
        .context("register gRPC service")?;

    consul
        .register(&ServiceRegistration {
            id: HTTP_SERVICE_ID.to_string(),
            name: HTTP_SERVICE_ID.to_string(),
            address: address.clone(),
            port: args.http_port,
            tags: vec!["metrics".into(), "controller".into(), "http".into(), "api".into()],
            check: ServiceCheck::http(format!(
                "http://{address}:{}/api/v1/health",
                args.http_port
            )),
        })
        .await
        .context("register HTTP service")?;

    info!("Registered with consul as {GRPC_SERVICE_ID}");
    Ok(())
}

async fn watch_signals(shutdown: watch::Sender<bool>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    info!("Shutdown signal received");
    let _ = shutdown.send(true);
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
