// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Script Dispatcher
//!
//! Fans a newly created script out to the target host set over their live
//! session streams. Delivery is best-effort: offline hosts, hosts without a
//! registered stream and per-host send failures are logged and skipped,
//! never aborting distribution to the remaining hosts. The semantic
//! acknowledgment is the `ScriptResult` the agent eventually streams back.

use std::sync::Arc;
use tracing::{info, warn};

use vigil_proto::{controller_message, ControllerMessage, ScriptCommand};

use crate::application::registry::StreamRegistry;
use crate::domain::host::Host;
use crate::domain::script::Script;

pub struct ScriptDispatcher {
    registry: Arc<StreamRegistry>,
}

impl ScriptDispatcher {
    pub fn new(registry: Arc<StreamRegistry>) -> Self {
        Self { registry }
    }

    /// Send `script` to every host in `hosts` with a live stream. Returns
    /// the number of sessions the command was handed to.
    pub async fn distribute(&self, script: &Script, hosts: &[Host]) -> usize {
        let command = ScriptCommand {
            script_id: script.id.to_string(),
            content: script.content.clone(),
            sha256_hash: script.sha256_hash.clone(),
        };

        let mut delivered = 0;
        for host in hosts {
            if !host.online {
                info!(hostname = %host.hostname, "Skipping offline host");
                continue;
            }

            let Some(handle) = self.registry.get(&host.hostname).await else {
                warn!(hostname = %host.hostname, "No active stream for host");
                continue;
            };

            let frame = ControllerMessage {
                payload: Some(controller_message::Payload::ScriptCommand(command.clone())),
            };

            match handle.send(Ok(frame)).await {
                Ok(()) => {
                    info!(script_id = %script.id, hostname = %host.hostname, "Script sent to host");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(hostname = %host.hostname, error = %e, "Failed to send script to host");
                }
            }
        }

        delivered
    }
}
