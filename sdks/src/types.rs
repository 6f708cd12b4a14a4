// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Response payloads of the controller API, as the wire serializes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostUsage {
    pub id: i64,
    pub host_id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub used_memory_bytes: i64,
    pub used_storage_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub sha256_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptExecution {
    pub id: i64,
    pub script_id: Uuid,
    pub host_id: i64,
    #[serde(default)]
    pub hostname: Option<String>,
    pub sha256_hash: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct HostsResponse {
    pub hosts: Vec<Host>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct HostDetail {
    pub host: Host,
    pub usage: Vec<HostUsage>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptsResponse {
    pub scripts: Vec<Script>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScriptDetail {
    pub script: Script,
    #[serde(default)]
    pub executions: Vec<ScriptExecution>,
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct CreateScriptRequest {
    pub name: String,
    pub content: String,
    pub tags: Vec<String>,
}
