// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SQLite Host Repository
//!
//! `HostRepository` implementation backed by the `hosts` and `host_usage`
//! tables. The heartbeat path is a single upsert keyed by hostname followed
//! by an append to `host_usage`; the maintenance sweeps run here as plain
//! `UPDATE`/`DELETE` statements.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{host_from_row, host_select};
use crate::domain::host::{ClusterStats, Host, HostHeartbeat, HostUsage, UsageSample};
use crate::domain::repository::{HostRepository, RepositoryError};

pub struct SqliteHostRepository {
    pool: SqlitePool,
}

impl SqliteHostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostRepository for SqliteHostRepository {
    async fn upsert_host(&self, heartbeat: &HostHeartbeat) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO hosts (hostname, ip, uptime_seconds, cpu_cores, total_memory_bytes,
                               total_storage_bytes, last_seen, online, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(hostname) DO UPDATE SET
                ip = excluded.ip,
                uptime_seconds = excluded.uptime_seconds,
                cpu_cores = excluded.cpu_cores,
                total_memory_bytes = excluded.total_memory_bytes,
                total_storage_bytes = excluded.total_storage_bytes,
                last_seen = excluded.last_seen,
                online = excluded.online,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&heartbeat.hostname)
        .bind(&heartbeat.ip)
        .bind(heartbeat.uptime_seconds)
        .bind(heartbeat.cpu_cores)
        .bind(heartbeat.total_memory_bytes)
        .bind(heartbeat.total_storage_bytes)
        .bind(heartbeat.last_seen)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn insert_usage(&self, sample: &UsageSample) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO host_usage (host_id, timestamp, cpu_percent, used_memory_bytes, used_storage_bytes)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sample.host_id)
        .bind(sample.timestamp)
        .bind(sample.cpu_percent)
        .bind(sample.used_memory_bytes)
        .bind(sample.used_storage_bytes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_inactive(&self, threshold: Duration) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE hosts SET online = 0 WHERE last_seen < ? AND online = 1")
            .bind(Utc::now() - threshold)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cleanup_old_usage(&self, retention: Duration) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM host_usage WHERE timestamp < ?")
            .bind(Utc::now() - retention)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_all_hosts(&self) -> Result<Vec<Host>, RepositoryError> {
        let rows = sqlx::query(&host_select("ORDER BY hostname"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(host_from_row).collect())
    }

    async fn get_host(&self, hostname: &str) -> Result<Option<Host>, RepositoryError> {
        let row = sqlx::query(&host_select("WHERE hostname = ?"))
            .bind(hostname)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(host_from_row))
    }

    async fn get_host_usage(
        &self,
        hostname: &str,
        limit: i64,
    ) -> Result<Vec<HostUsage>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT hu.id, hu.host_id, hu.timestamp, hu.cpu_percent,
                   hu.used_memory_bytes, hu.used_storage_bytes
            FROM host_usage hu
            JOIN hosts h ON hu.host_id = h.id
            WHERE h.hostname = ?
            ORDER BY hu.timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(hostname)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HostUsage {
                id: row.get("id"),
                host_id: row.get("host_id"),
                timestamp: row.get("timestamp"),
                cpu_percent: row.get("cpu_percent"),
                used_memory_bytes: row.get("used_memory_bytes"),
                used_storage_bytes: row.get("used_storage_bytes"),
            })
            .collect())
    }

    async fn get_cluster_stats(&self) -> Result<ClusterStats, RepositoryError> {
        let counts = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN online = 1 THEN 1 ELSE 0 END), 0) AS online
             FROM hosts",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_hosts: i64 = counts.get("total");
        let online_hosts: i64 = counts.get("online");

        let capacity = sqlx::query(
            "SELECT COALESCE(SUM(cpu_cores), 0) AS cpu,
                    COALESCE(SUM(total_memory_bytes), 0) AS mem,
                    COALESCE(SUM(total_storage_bytes), 0) AS storage
             FROM hosts WHERE online = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let avg: Option<f64> = sqlx::query("SELECT AVG(cpu_percent) AS avg FROM host_usage WHERE timestamp > ?")
            .bind(Utc::now() - Duration::minutes(5))
            .fetch_one(&self.pool)
            .await?
            .get("avg");

        Ok(ClusterStats {
            total_hosts,
            online_hosts,
            offline_hosts: total_hosts - online_hosts,
            total_cpu_cores: capacity.get("cpu"),
            total_memory_bytes: capacity.get("mem"),
            total_storage_bytes: capacity.get("storage"),
            avg_cpu_percent: avg.unwrap_or(0.0),
        })
    }
}
