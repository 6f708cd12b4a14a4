// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Script aggregate: immutable content-addressed shell scripts, the log of
//! their executions across the fleet, and the tags used to target them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub Uuid);

impl ScriptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable script. The sha256 of `content` is the unit of at-most-once
/// execution on agents: identical content re-uploaded under a new id is
/// still suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    pub content: String,
    pub sha256_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Script {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let sha256_hash = content_hash(&content);
        Self {
            id: ScriptId::new(),
            name: name.into(),
            content,
            sha256_hash,
            created_at: Utc::now(),
        }
    }
}

/// Hex-encoded sha256 of script content.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// One recorded outcome of a script run on a host. `hostname` is joined in
/// on read; it is not stored on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptExecution {
    pub id: i64,
    pub script_id: ScriptId,
    pub host_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub sha256_hash: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub executed_at: DateTime<Utc>,
}

/// An execution outcome about to be appended.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub script_id: ScriptId,
    pub host_id: i64,
    pub sha256_hash: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub executed_at: DateTime<Utc>,
}

/// A free-form label attached to hosts, used as a script target selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
