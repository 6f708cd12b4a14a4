// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host probe: snapshots local OS counters into one `HostMetrics` frame.
//!
//! CPU busy-percentage is sampled over a one-second window synchronous with
//! the frame; everything else is point-in-time. If any counter is
//! unavailable the whole snapshot fails and the caller skips the tick.

use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, System};

use vigil_proto::{HostInfo, HostMetrics, ResourceUsage};

/// Window over which the instantaneous CPU percentage is measured.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Hostname unavailable")]
    Hostname,

    #[error("{0} counters unavailable")]
    Unavailable(&'static str),
}

pub struct HostProbe {
    hostname: String,
    ip: String,
    sys: System,
}

impl HostProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let hostname = System::host_name().ok_or(ProbeError::Hostname)?;
        // Loopback when the host has no routable interface; the hostname is
        // the identity the controller keys on either way.
        let ip = local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        Ok(Self {
            hostname,
            ip,
            sys: System::new(),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Produce one metrics frame. Takes roughly `CPU_SAMPLE_WINDOW` of wall
    /// clock because of the CPU measurement.
    pub async fn snapshot(&mut self) -> Result<HostMetrics, ProbeError> {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_usage();

        let total_memory = self.sys.total_memory();
        if total_memory == 0 {
            return Err(ProbeError::Unavailable("memory"));
        }
        let used_memory = self.sys.used_memory();

        let cpu_cores = self.sys.cpus().len();
        if cpu_cores == 0 {
            return Err(ProbeError::Unavailable("cpu"));
        }

        let (total_storage, used_storage) = root_storage()?;

        // Second CPU refresh after the window gives the busy percentage
        // across it.
        tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
        self.sys.refresh_cpu_usage();
        let cpu_percent = f64::from(self.sys.global_cpu_info().cpu_usage());

        Ok(HostMetrics {
            hostname: self.hostname.clone(),
            ip: self.ip.clone(),
            timestamp: Utc::now().timestamp(),
            info: Some(HostInfo {
                uptime_seconds: System::uptime() as i64,
                cpu_cores: cpu_cores as i32,
                total_memory_bytes: total_memory as i64,
                total_storage_bytes: total_storage as i64,
            }),
            usage: Some(ResourceUsage {
                cpu_percent,
                used_memory_bytes: used_memory as i64,
                used_storage_bytes: used_storage as i64,
            }),
        })
    }
}

/// Total and used bytes of the root filesystem. Falls back to summing all
/// mounts when no disk is mounted exactly at `/`.
fn root_storage() -> Result<(u64, u64), ProbeError> {
    let disks = Disks::new_with_refreshed_list();

    let root = disks
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"));

    if let Some(disk) = root {
        return Ok((
            disk.total_space(),
            disk.total_space().saturating_sub(disk.available_space()),
        ));
    }

    let mut total = 0u64;
    let mut available = 0u64;
    for disk in disks.iter() {
        total += disk.total_space();
        available += disk.available_space();
    }

    if total == 0 {
        return Err(ProbeError::Unavailable("storage"));
    }

    Ok((total, total.saturating_sub(available)))
}
