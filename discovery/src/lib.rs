// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consul service discovery for vigil.
//!
//! Agents watch the registry to locate the controller as its endpoint
//! moves; the controller registers its gRPC and HTTP endpoints with
//! health checks that deregister the service once it stays critical.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Cadence of the watch loop between successful polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Back-off after a failed registry query.
const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No healthy instances of service {0}")]
    NoHealthyInstances(String),
}

/// Consul health API entry: the advertised service address wins, falling
/// back to the node address; the port always comes from the service.
#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Node")]
    node: NodeEntry,
    #[serde(rename = "Service")]
    service: ServiceEntry,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

/// A service registration, mirroring consul's agent API payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Check")]
    pub check: ServiceCheck,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCheck {
    #[serde(rename = "GRPC", skip_serializing_if = "Option::is_none")]
    pub grpc: Option<String>,
    #[serde(rename = "HTTP", skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "Timeout")]
    pub timeout: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    pub deregister_critical_service_after: String,
}

impl ServiceCheck {
    pub fn grpc(target: impl Into<String>) -> Self {
        Self {
            grpc: Some(target.into()),
            http: None,
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            deregister_critical_service_after: "30s".to_string(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self {
            grpc: None,
            http: Some(url.into()),
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            deregister_critical_service_after: "30s".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ConsulClient {
    base_url: String,
    http: reqwest::Client,
    poll_interval: Duration,
    failure_backoff: Duration,
}

impl ConsulClient {
    /// `addr` is a consul HTTP address such as `127.0.0.1:8500`, with or
    /// without a scheme.
    pub fn new(addr: impl AsRef<str>) -> Self {
        let addr = addr.as_ref();
        let base_url = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{addr}")
        };

        Self {
            base_url,
            http: reqwest::Client::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
        }
    }

    /// Override the watch cadence.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the back-off after failed polls.
    pub fn with_failure_backoff(mut self, failure_backoff: Duration) -> Self {
        self.failure_backoff = failure_backoff;
        self
    }

    /// Resolve the current `host:port` of a healthy instance of `service`.
    pub async fn discover(&self, service: &str) -> Result<String, DiscoveryError> {
        let url = format!("{}/v1/health/service/{service}?passing=true", self.base_url);
        let entries: Vec<HealthEntry> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let entry = entries
            .first()
            .ok_or_else(|| DiscoveryError::NoHealthyInstances(service.to_string()))?;

        let addr = if entry.service.address.is_empty() {
            &entry.node.address
        } else {
            &entry.service.address
        };

        Ok(format!("{}:{}", addr, entry.service.port))
    }

    /// Watch `service` and emit its address whenever it first resolves or
    /// changes. The loop ends when the receiver is dropped.
    pub fn watch(self, service: String) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut last_addr = String::new();
            loop {
                match self.discover(&service).await {
                    Ok(addr) => {
                        if addr != last_addr {
                            info!(%service, %addr, "Discovered service");
                            if tx.send(addr.clone()).await.is_err() {
                                return;
                            }
                            last_addr = addr;
                        }
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    Err(e) => {
                        warn!(%service, error = %e, "Discovery failed");
                        tokio::time::sleep(self.failure_backoff).await;
                    }
                }
            }
        });

        rx
    }

    pub async fn register(&self, registration: &ServiceRegistration) -> Result<(), DiscoveryError> {
        let url = format!("{}/v1/agent/service/register", self.base_url);
        self.http
            .put(&url)
            .json(registration)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn deregister(&self, service_id: &str) -> Result<(), DiscoveryError> {
        let url = format!("{}/v1/agent/service/deregister/{service_id}", self.base_url);
        self.http.put(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
