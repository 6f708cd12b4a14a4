// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host aggregate: one row per monitored machine, keyed by hostname, plus
//! the append-only usage samples its heartbeats produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored machine as the store knows it. Created on first heartbeat,
/// mutated by every subsequent one; never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    pub hostname: String,
    pub ip: String,
    pub uptime_seconds: i64,
    pub cpu_cores: i32,
    pub total_memory_bytes: i64,
    pub total_storage_bytes: i64,
    pub last_seen: DateTime<Utc>,
    pub online: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable slice of a host row carried by a single heartbeat.
/// `upsert_host` inserts or updates by `hostname`.
#[derive(Debug, Clone)]
pub struct HostHeartbeat {
    pub hostname: String,
    pub ip: String,
    pub uptime_seconds: i64,
    pub cpu_cores: i32,
    pub total_memory_bytes: i64,
    pub total_storage_bytes: i64,
    pub last_seen: DateTime<Utc>,
}

/// One persisted usage sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostUsage {
    pub id: i64,
    pub host_id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub used_memory_bytes: i64,
    pub used_storage_bytes: i64,
}

/// A usage sample about to be appended (no id yet).
#[derive(Debug, Clone)]
pub struct UsageSample {
    pub host_id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub used_memory_bytes: i64,
    pub used_storage_bytes: i64,
}

/// Fleet-wide aggregates served by the read API. Capacity sums cover only
/// hosts currently marked online; `avg_cpu_percent` averages usage rows from
/// the last five minutes and is 0.0 when there are none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_hosts: i64,
    pub online_hosts: i64,
    pub offline_hosts: i64,
    pub total_cpu_cores: i64,
    pub total_memory_bytes: i64,
    pub total_storage_bytes: i64,
    pub avg_cpu_percent: f64,
}
