// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Stream Registry
//!
//! Controller-side map from hostname to the outbound half of a live agent
//! session. Session handlers insert on the first successfully processed
//! metrics frame and remove on teardown; the dispatcher reads handles to
//! push `ScriptCommand` frames.
//!
//! At most one entry exists per hostname. A newer session for the same
//! hostname takes over the slot; the displaced session keeps processing
//! ingress but can no longer be reached by the dispatcher, and its eventual
//! teardown must not evict the newer entry, so removal checks channel
//! identity.

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tonic::Status;
use tracing::info;

use vigil_proto::ControllerMessage;

/// Send half of a session's outbound stream.
pub type OutboundHandle = mpsc::Sender<Result<ControllerMessage, Status>>;

#[derive(Default)]
pub struct StreamRegistry {
    streams: RwLock<HashMap<String, OutboundHandle>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a session's outbound handle to a hostname, displacing any
    /// previous session for the same host.
    pub async fn register(&self, hostname: &str, handle: OutboundHandle) {
        let previous = self
            .streams
            .write()
            .await
            .insert(hostname.to_string(), handle);
        if previous.is_some() {
            info!(hostname, "Replaced stream for host");
        } else {
            info!(hostname, "Registered stream for host");
        }
    }

    /// Remove the slot for `hostname`, but only while it still belongs to
    /// the session identified by `handle`.
    pub async fn deregister(&self, hostname: &str, handle: &OutboundHandle) {
        let mut streams = self.streams.write().await;
        if let Some(current) = streams.get(hostname) {
            if current.same_channel(handle) {
                streams.remove(hostname);
                info!(hostname, "Removed stream for host");
            }
        }
    }

    pub async fn get(&self, hostname: &str) -> Option<OutboundHandle> {
        self.streams.read().await.get(hostname).cloned()
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> OutboundHandle {
        mpsc::channel(1).0
    }

    #[tokio::test]
    async fn register_replaces_previous_slot() {
        let registry = StreamRegistry::new();
        let first = handle();
        let second = handle();

        registry.register("h1", first.clone()).await;
        registry.register("h1", second.clone()).await;
        assert_eq!(registry.len().await, 1);

        let current = registry.get("h1").await.unwrap();
        assert!(current.same_channel(&second));
    }

    #[tokio::test]
    async fn displaced_session_cannot_evict_successor() {
        let registry = StreamRegistry::new();
        let first = handle();
        let second = handle();

        registry.register("h1", first.clone()).await;
        registry.register("h1", second.clone()).await;

        // The displaced session tears down later; the live slot survives.
        registry.deregister("h1", &first).await;
        assert!(registry.get("h1").await.is_some());

        registry.deregister("h1", &second).await;
        assert!(registry.get("h1").await.is_none());
    }
}
