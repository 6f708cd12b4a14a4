// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dispatch;
pub mod maintenance;
pub mod registry;

pub use dispatch::ScriptDispatcher;
pub use maintenance::{run_maintenance, MaintenanceConfig};
pub use registry::{OutboundHandle, StreamRegistry};
