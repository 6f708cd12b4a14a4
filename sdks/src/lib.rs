// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client SDK for the vigil controller's HTTP API.

pub mod client;
pub mod types;

pub use client::VigilClient;
pub use types::*;
