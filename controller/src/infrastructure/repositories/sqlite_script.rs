// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SQLite Script Repository
//!
//! `ScriptRepository` implementation over the `scripts` and
//! `script_executions` tables. Script ids are stored as uuid text;
//! deleting a script cascades to its execution log.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{RepositoryError, ScriptRepository};
use crate::domain::script::{NewExecution, Script, ScriptExecution, ScriptId};

pub struct SqliteScriptRepository {
    pool: SqlitePool,
}

impl SqliteScriptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn script_from_row(row: &SqliteRow) -> Result<Script, RepositoryError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| RepositoryError::Database(format!("Invalid script id: {e}")))?;
    Ok(Script {
        id: ScriptId(id),
        name: row.get("name"),
        content: row.get("content"),
        sha256_hash: row.get("sha256_hash"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ScriptRepository for SqliteScriptRepository {
    async fn create_script(&self, script: &Script) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO scripts (id, name, content, sha256_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(script.id.to_string())
        .bind(&script.name)
        .bind(&script.content)
        .bind(&script.sha256_hash)
        .bind(script.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_script(&self, id: ScriptId) -> Result<Option<Script>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, content, sha256_hash, created_at FROM scripts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(script_from_row).transpose()
    }

    async fn get_all_scripts(&self) -> Result<Vec<Script>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, content, sha256_hash, created_at FROM scripts
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(script_from_row).collect()
    }

    async fn delete_script(&self, id: ScriptId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM scripts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_execution(&self, execution: &NewExecution) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO script_executions (script_id, host_id, sha256_hash, exit_code, stdout, stderr, executed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(execution.script_id.to_string())
        .bind(execution.host_id)
        .bind(&execution.sha256_hash)
        .bind(execution.exit_code)
        .bind(&execution.stdout)
        .bind(&execution.stderr)
        .bind(execution.executed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_executions(
        &self,
        script_id: ScriptId,
    ) -> Result<Vec<ScriptExecution>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT se.id, se.script_id, se.host_id, h.hostname, se.sha256_hash,
                   se.exit_code, se.stdout, se.stderr, se.executed_at
            FROM script_executions se
            JOIN hosts h ON se.host_id = h.id
            WHERE se.script_id = ?
            ORDER BY se.executed_at DESC
            "#,
        )
        .bind(script_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let raw_id: String = row.get("script_id");
                let script_id = Uuid::parse_str(&raw_id)
                    .map_err(|e| RepositoryError::Database(format!("Invalid script id: {e}")))?;
                Ok(ScriptExecution {
                    id: row.get("id"),
                    script_id: ScriptId(script_id),
                    host_id: row.get("host_id"),
                    hostname: Some(row.get("hostname")),
                    sha256_hash: row.get("sha256_hash"),
                    exit_code: row.get("exit_code"),
                    stdout: row.get("stdout"),
                    stderr: row.get("stderr"),
                    executed_at: row.get("executed_at"),
                })
            })
            .collect()
    }

    async fn has_executed(
        &self,
        hostname: &str,
        sha256_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM script_executions se
            JOIN hosts h ON se.host_id = h.id
            WHERE h.hostname = ? AND se.sha256_hash = ?
            "#,
        )
        .bind(hostname)
        .bind(sha256_hash)
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        Ok(n > 0)
    }
}
