// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Vigil controller core.
//!
//! Ingests heartbeats from fleet agents over long-lived duplex streams,
//! persists them, and pushes one-shot scripts back over the same streams.
//!
//! # Architecture
//!
//! - **domain**: entities and repository contracts
//! - **application**: stream registry, script dispatcher, maintenance sweeps
//! - **infrastructure**: SQLite-backed repositories via `sqlx`
//! - **presentation**: gRPC session protocol and HTTP read API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
