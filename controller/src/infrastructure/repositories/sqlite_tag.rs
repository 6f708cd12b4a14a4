// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SQLite Tag Repository
//!
//! `TagRepository` implementation over `tags` and `host_tags`. Tag-based
//! host selection uses union semantics; an empty tag list selects the whole
//! fleet.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{host_from_row, host_select};
use crate::domain::host::Host;
use crate::domain::repository::{RepositoryError, TagRepository};
use crate::domain::script::Tag;

pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn host_id(&self, hostname: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT id FROM hosts WHERE hostname = ?")
            .bind(hostname)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.get("id")),
            None => Err(RepositoryError::NotFound(format!("host {hostname}"))),
        }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn get_or_create_tag(&self, name: &str) -> Result<i64, RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("id"))
    }

    async fn add_host_tag(&self, hostname: &str, tag: &str) -> Result<(), RepositoryError> {
        let host_id = self.host_id(hostname).await?;
        let tag_id = self.get_or_create_tag(tag).await?;

        sqlx::query("INSERT OR IGNORE INTO host_tags (host_id, tag_id) VALUES (?, ?)")
            .bind(host_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_host_tag(&self, hostname: &str, tag: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            DELETE FROM host_tags
            WHERE host_id = (SELECT id FROM hosts WHERE hostname = ?)
              AND tag_id = (SELECT id FROM tags WHERE name = ?)
            "#,
        )
        .bind(hostname)
        .bind(tag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_host_tags(&self, hostname: &str) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM tags t
            JOIN host_tags ht ON t.id = ht.tag_id
            JOIN hosts h ON ht.host_id = h.id
            WHERE h.hostname = ?
            ORDER BY t.name
            "#,
        )
        .bind(hostname)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn get_all_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn get_hosts_by_tags(&self, tags: &[String]) -> Result<Vec<Host>, RepositoryError> {
        if tags.is_empty() {
            let rows = sqlx::query(&host_select("ORDER BY hostname"))
                .fetch_all(&self.pool)
                .await?;
            return Ok(rows.iter().map(host_from_row).collect());
        }

        let placeholders = vec!["?"; tags.len()].join(", ");
        let sql = format!(
            r#"
            SELECT DISTINCT h.id, h.hostname, h.ip, h.uptime_seconds, h.cpu_cores,
                   h.total_memory_bytes, h.total_storage_bytes, h.last_seen, h.online,
                   h.created_at, h.updated_at
            FROM hosts h
            JOIN host_tags ht ON h.id = ht.host_id
            JOIN tags t ON ht.tag_id = t.id
            WHERE t.name IN ({placeholders})
            ORDER BY h.hostname
            "#
        );

        let mut query = sqlx::query(&sql);
        for tag in tags {
            query = query.bind(tag);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(host_from_row).collect())
    }
}
