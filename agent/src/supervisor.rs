// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session supervisor.
//!
//! Runs one client session at a time against either a fixed controller
//! endpoint or whatever address the service registry currently advertises.
//! Session failures back off and retry; a new discovery event preempts the
//! running session so the agent follows the controller as it moves.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use vigil_discovery::ConsulClient;

use crate::client::AgentSession;
use crate::executor::ScriptExecutor;
use crate::probe::HostProbe;

/// Registry name the controller's gRPC endpoint is published under.
const CONTROLLER_SERVICE: &str = "vigil-controller";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Fixed controller endpoint; bypasses discovery when set.
    pub controller_url: Option<String>,
    /// Consul HTTP address for discovery mode.
    pub consul_addr: Option<String>,
    pub report_interval: Duration,
    pub retry_delay: Duration,
}

pub async fn run(config: AgentConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    let executor = Arc::new(ScriptExecutor::new()?);

    if let Some(endpoint) = &config.controller_url {
        info!(%endpoint, "Using direct controller endpoint");
        return run_fixed(endpoint, &config, executor, shutdown).await;
    }

    let consul_addr = config
        .consul_addr
        .clone()
        .unwrap_or_else(|| "127.0.0.1:8500".to_string());
    info!(%consul_addr, "Using consul service discovery");

    let addr_rx = ConsulClient::new(&consul_addr).watch(CONTROLLER_SERVICE.to_string());
    run_discovered(addr_rx, &config, executor, shutdown).await
}

async fn run_fixed(
    endpoint: &str,
    config: &AgentConfig,
    executor: Arc<ScriptExecutor>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        match run_session(endpoint, config, executor.clone(), shutdown.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!(error = %e, "Client error, retrying"),
        }

        tokio::select! {
            _ = tokio::time::sleep(config.retry_delay) => {}
            _ = shutdown.changed() => return Ok(()),
        }
    }
}

async fn run_discovered(
    mut addr_rx: mpsc::Receiver<String>,
    config: &AgentConfig,
    executor: Arc<ScriptExecutor>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut endpoint: Option<String> = None;

    loop {
        let current = match endpoint.take() {
            Some(addr) => addr,
            None => tokio::select! {
                addr = addr_rx.recv() => match addr {
                    Some(addr) => addr,
                    None => return Ok(()),
                },
                _ = shutdown.changed() => return Ok(()),
            },
        };

        tokio::select! {
            result = run_session(&current, config, executor.clone(), shutdown.clone()) => {
                match result {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!(error = %e, "Client error, retrying");
                        // Retry the same endpoint unless discovery moves it
                        // first.
                        endpoint = Some(current);
                        tokio::select! {
                            _ = tokio::time::sleep(config.retry_delay) => {}
                            addr = addr_rx.recv() => match addr {
                                Some(addr) => endpoint = Some(addr),
                                None => return Ok(()),
                            },
                            _ = shutdown.changed() => return Ok(()),
                        }
                    }
                }
            }
            addr = addr_rx.recv() => match addr {
                Some(addr) => {
                    info!(%addr, "Controller endpoint changed, reconnecting");
                    endpoint = Some(addr);
                }
                None => return Ok(()),
            },
        }
    }
}

async fn run_session(
    endpoint: &str,
    config: &AgentConfig,
    executor: Arc<ScriptExecutor>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!(endpoint, "Connecting to controller");

    let probe = HostProbe::new()?;
    let session = AgentSession::connect(endpoint, probe, executor).await?;

    info!("Connected, streaming metrics");
    session.run(config.report_interval, shutdown).await?;
    Ok(())
}
