// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SQLite Connection Pool
//!
//! Wraps `sqlx::sqlite::SqlitePool` in a thin `Database` newtype that can be
//! injected into all SQLite repository implementations. Opening the database
//! also applies the schema; this is the one operation in the core whose
//! failure is fatal at startup.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS hosts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hostname TEXT NOT NULL UNIQUE,
        ip TEXT NOT NULL,
        uptime_seconds INTEGER NOT NULL,
        cpu_cores INTEGER NOT NULL,
        total_memory_bytes INTEGER NOT NULL,
        total_storage_bytes INTEGER NOT NULL,
        last_seen TIMESTAMP NOT NULL,
        online BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_hosts_hostname ON hosts(hostname)",
    "CREATE INDEX IF NOT EXISTS idx_hosts_last_seen ON hosts(last_seen)",
    "CREATE INDEX IF NOT EXISTS idx_hosts_online ON hosts(online)",
    "CREATE TABLE IF NOT EXISTS host_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host_id INTEGER NOT NULL,
        timestamp TIMESTAMP NOT NULL,
        cpu_percent REAL NOT NULL,
        used_memory_bytes INTEGER NOT NULL,
        used_storage_bytes INTEGER NOT NULL,
        FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_host_usage_host_id ON host_usage(host_id)",
    "CREATE INDEX IF NOT EXISTS idx_host_usage_timestamp ON host_usage(timestamp)",
    "CREATE TABLE IF NOT EXISTS scripts (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        content TEXT NOT NULL,
        sha256_hash TEXT NOT NULL UNIQUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_scripts_sha256 ON scripts(sha256_hash)",
    "CREATE TABLE IF NOT EXISTS script_executions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        script_id TEXT NOT NULL,
        host_id INTEGER NOT NULL,
        sha256_hash TEXT NOT NULL,
        exit_code INTEGER NOT NULL,
        stdout TEXT NOT NULL,
        stderr TEXT NOT NULL,
        executed_at TIMESTAMP NOT NULL,
        FOREIGN KEY (script_id) REFERENCES scripts(id) ON DELETE CASCADE,
        FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_script_executions_hash_host
        ON script_executions(sha256_hash, host_id)",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS host_tags (
        host_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (host_id, tag_id),
        FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE,
        FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
    )",
];

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `path` and apply the
    /// schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open database")?;

        let db = Self { pool };
        db.migrate().await.context("Failed to migrate database")?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
