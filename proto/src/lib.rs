// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Generated wire types for the vigil control plane.
//!
//! The schema lives in `proto/vigil.proto`: a single `MetricsCollector`
//! service with one bidirectional `StreamMetrics` RPC. Agent-originated
//! frames are `AgentMessage` (metrics or script results); controller
//! replies are `ControllerMessage` (acknowledgments or script commands).

pub mod v1 {
    tonic::include_proto!("vigil.v1");
}

pub use v1::*;

/// Ceiling for a single frame in either direction. Scripts travel inline in
/// `ScriptCommand` frames, so the limit must comfortably exceed any script
/// an operator would realistically push.
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;
