// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository contracts for the persistence store.
//!
//! One trait per aggregate root. The SQLite implementations live in
//! `infrastructure::repositories`; session handlers, the dispatcher and the
//! read API depend only on these traits.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::host::{ClusterStats, Host, HostHeartbeat, HostUsage, UsageSample};
use crate::domain::script::{NewExecution, Script, ScriptExecution, ScriptId, Tag};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

/// Host rows and their usage samples.
#[async_trait]
pub trait HostRepository: Send + Sync {
    /// Insert a host on first heartbeat, update all mutable fields on every
    /// subsequent one (keyed by hostname). Returns the host id either way.
    async fn upsert_host(&self, heartbeat: &HostHeartbeat) -> Result<i64, RepositoryError>;

    /// Append one usage sample.
    async fn insert_usage(&self, sample: &UsageSample) -> Result<(), RepositoryError>;

    /// Flip `online` to false for hosts not seen within `threshold`.
    async fn mark_inactive(&self, threshold: Duration) -> Result<(), RepositoryError>;

    /// Delete usage samples older than `retention`.
    async fn cleanup_old_usage(&self, retention: Duration) -> Result<(), RepositoryError>;

    async fn get_all_hosts(&self) -> Result<Vec<Host>, RepositoryError>;

    async fn get_host(&self, hostname: &str) -> Result<Option<Host>, RepositoryError>;

    /// The `limit` most recent usage samples for a host, newest first.
    async fn get_host_usage(
        &self,
        hostname: &str,
        limit: i64,
    ) -> Result<Vec<HostUsage>, RepositoryError>;

    async fn get_cluster_stats(&self) -> Result<ClusterStats, RepositoryError>;
}

/// Scripts and their execution log.
#[async_trait]
pub trait ScriptRepository: Send + Sync {
    async fn create_script(&self, script: &Script) -> Result<(), RepositoryError>;

    async fn get_script(&self, id: ScriptId) -> Result<Option<Script>, RepositoryError>;

    /// All scripts, newest first.
    async fn get_all_scripts(&self) -> Result<Vec<Script>, RepositoryError>;

    /// Delete a script; its executions cascade.
    async fn delete_script(&self, id: ScriptId) -> Result<(), RepositoryError>;

    async fn record_execution(&self, execution: &NewExecution) -> Result<(), RepositoryError>;

    /// Executions of a script, newest first, with the hostname joined in.
    async fn get_executions(
        &self,
        script_id: ScriptId,
    ) -> Result<Vec<ScriptExecution>, RepositoryError>;

    /// Whether the given host has recorded an execution of this content hash.
    async fn has_executed(
        &self,
        hostname: &str,
        sha256_hash: &str,
    ) -> Result<bool, RepositoryError>;
}

/// Tags and host↔tag assignments.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn get_or_create_tag(&self, name: &str) -> Result<i64, RepositoryError>;

    async fn add_host_tag(&self, hostname: &str, tag: &str) -> Result<(), RepositoryError>;

    async fn remove_host_tag(&self, hostname: &str, tag: &str) -> Result<(), RepositoryError>;

    async fn get_host_tags(&self, hostname: &str) -> Result<Vec<Tag>, RepositoryError>;

    async fn get_all_tags(&self) -> Result<Vec<Tag>, RepositoryError>;

    /// Hosts carrying any of the given tags (union). An empty list selects
    /// every host.
    async fn get_hosts_by_tags(&self, tags: &[String]) -> Result<Vec<Host>, RepositoryError>;
}
