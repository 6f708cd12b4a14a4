// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Vigil host agent.
//!
//! Streams resource metrics to the controller over a long-lived duplex
//! session and executes the one-shot scripts pushed back over the same
//! stream, with durable replay suppression keyed by content hash.

pub mod client;
pub mod executor;
pub mod probe;
pub mod supervisor;

pub use client::{AgentSession, SessionError};
pub use executor::{ExecutorError, ScriptExecutor};
pub use probe::{HostProbe, ProbeError};
