// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! SQLite repository implementations.

pub mod sqlite_host;
pub mod sqlite_script;
pub mod sqlite_tag;

pub use sqlite_host::SqliteHostRepository;
pub use sqlite_script::SqliteScriptRepository;
pub use sqlite_tag::SqliteTagRepository;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::host::Host;

/// Shared row→`Host` mapping (the host and tag repositories both return
/// full host rows).
pub(crate) fn host_from_row(row: &SqliteRow) -> Host {
    Host {
        id: row.get("id"),
        hostname: row.get("hostname"),
        ip: row.get("ip"),
        uptime_seconds: row.get("uptime_seconds"),
        cpu_cores: row.get("cpu_cores"),
        total_memory_bytes: row.get("total_memory_bytes"),
        total_storage_bytes: row.get("total_storage_bytes"),
        last_seen: row.get("last_seen"),
        online: row.get("online"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const HOST_COLUMNS: &str = "id, hostname, ip, uptime_seconds, cpu_cores, total_memory_bytes, \
                            total_storage_bytes, last_seen, online, created_at, updated_at";

pub(crate) fn host_select(clause: &str) -> String {
    format!("SELECT {HOST_COLUMNS} FROM hosts {clause}")
}
