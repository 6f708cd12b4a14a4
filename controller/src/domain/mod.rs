// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod host;
pub mod script;
pub mod repository;

pub use host::{ClusterStats, Host, HostHeartbeat, HostUsage, UsageSample};
pub use script::{NewExecution, Script, ScriptExecution, ScriptId, Tag};
pub use repository::{HostRepository, RepositoryError, ScriptRepository, TagRepository};
