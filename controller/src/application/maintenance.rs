// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Maintenance Sweeps
//!
//! Two periodic passes over the store for the controller's lifetime: the
//! inactivity sweep flips `online` off for hosts that stopped heartbeating,
//! and the retention sweep trims old usage samples. A failed pass is logged
//! and the ticker keeps going.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::repository::HostRepository;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Cadence of the inactivity sweep.
    pub sweep_interval: Duration,
    /// A host is offline once `last_seen` is older than this. Must exceed
    /// the agents' heartbeat interval.
    pub inactive_timeout: chrono::Duration,
    /// Cadence of the retention sweep.
    pub cleanup_interval: Duration,
    /// Usage samples older than this are deleted.
    pub retention_period: chrono::Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            inactive_timeout: chrono::Duration::seconds(60),
            cleanup_interval: Duration::from_secs(300),
            retention_period: chrono::Duration::days(7),
        }
    }
}

/// Run both sweeps until `shutdown` flips.
pub async fn run_maintenance(
    hosts: Arc<dyn HostRepository>,
    config: MaintenanceConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut inactive_ticker = tokio::time::interval(config.sweep_interval);
    let mut cleanup_ticker = tokio::time::interval(config.cleanup_interval);

    loop {
        tokio::select! {
            _ = inactive_ticker.tick() => {
                if let Err(e) = hosts.mark_inactive(config.inactive_timeout).await {
                    warn!(error = %e, "Error marking inactive hosts");
                } else {
                    debug!("Inactivity sweep completed");
                }
            }
            _ = cleanup_ticker.tick() => {
                if let Err(e) = hosts.cleanup_old_usage(config.retention_period).await {
                    warn!(error = %e, "Error cleaning up old usage data");
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}
