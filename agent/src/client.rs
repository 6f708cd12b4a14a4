// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent side of the duplex session.
//!
//! One session owns both stream halves: a metrics tick sends `Metrics`
//! frames on a fixed cadence, while the receive side handles `Ack` frames
//! and spawns one task per inbound `ScriptCommand`. Any stream failure ends
//! the session; the supervisor decides whether to reconnect.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Endpoint;
use tonic::{Request, Streaming};
use tracing::{info, warn};

use vigil_proto::metrics_collector_client::MetricsCollectorClient;
use vigil_proto::{
    agent_message, controller_message, AgentMessage, ControllerMessage, ScriptCommand,
    MAX_FRAME_BYTES,
};

use crate::executor::ScriptExecutor;
use crate::probe::HostProbe;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("stream closed by controller")]
    Closed,

    #[error("send to stream failed")]
    SendFailed,
}

pub struct AgentSession {
    probe: HostProbe,
    executor: Arc<ScriptExecutor>,
    outbound: mpsc::Sender<AgentMessage>,
    inbound: Streaming<ControllerMessage>,
}

impl AgentSession {
    /// Open the duplex stream to `addr` (`host:port`, scheme optional).
    pub async fn connect(
        addr: &str,
        probe: HostProbe,
        executor: Arc<ScriptExecutor>,
    ) -> Result<Self, SessionError> {
        let endpoint = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };

        let channel = Endpoint::from_shared(endpoint)?.connect().await?;
        let mut client = MetricsCollectorClient::new(channel)
            .max_decoding_message_size(MAX_FRAME_BYTES)
            .max_encoding_message_size(MAX_FRAME_BYTES);

        let (outbound, rx) = mpsc::channel::<AgentMessage>(16);
        let response = client
            .stream_metrics(Request::new(ReceiverStream::new(rx)))
            .await?;

        Ok(Self {
            probe,
            executor,
            outbound,
            inbound: response.into_inner(),
        })
    }

    /// Drive the session until a stream error or shutdown. A clean shutdown
    /// returns `Ok`; every stream failure is an error so the supervisor can
    /// back off and reconnect.
    pub async fn run(
        mut self,
        report_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError> {
        let mut ticker = tokio::time::interval(report_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.send_metrics().await?;
                }
                msg = self.inbound.message() => {
                    match msg {
                        Ok(Some(msg)) => self.handle_message(msg),
                        Ok(None) => return Err(SessionError::Closed),
                        Err(status) => return Err(SessionError::Rpc(status)),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Session shutting down");
                    return Ok(());
                }
            }
        }
    }

    async fn send_metrics(&mut self) -> Result<(), SessionError> {
        let metrics = match self.probe.snapshot().await {
            Ok(metrics) => metrics,
            Err(e) => {
                // A failed probe skips this tick; the session stays up.
                warn!(error = %e, "Probe failed, skipping tick");
                return Ok(());
            }
        };

        let msg = AgentMessage {
            payload: Some(agent_message::Payload::Metrics(metrics)),
        };
        self.outbound
            .send(msg)
            .await
            .map_err(|_| SessionError::SendFailed)
    }

    fn handle_message(&self, msg: ControllerMessage) {
        match msg.payload {
            Some(controller_message::Payload::Ack(ack)) => {
                if !ack.success {
                    warn!(message = %ack.message, "Controller reported error");
                }
            }
            Some(controller_message::Payload::ScriptCommand(cmd)) => {
                info!(script_id = %cmd.script_id, "Received script command");
                tokio::spawn(run_script(
                    self.executor.clone(),
                    self.outbound.clone(),
                    cmd,
                ));
            }
            None => warn!("Controller message without payload"),
        }
    }
}

/// Gate on the replay log, execute, and send the result back best-effort.
/// If the session is gone by the time the script finishes, the result is
/// discarded; the replay log has recorded the hash either way.
async fn run_script(
    executor: Arc<ScriptExecutor>,
    outbound: mpsc::Sender<AgentMessage>,
    cmd: ScriptCommand,
) {
    if executor.has_executed(&cmd.sha256_hash).await {
        info!(script_id = %cmd.script_id, "Script already executed, skipping");
        return;
    }

    match executor
        .execute(&cmd.script_id, &cmd.content, &cmd.sha256_hash)
        .await
    {
        Ok(result) => {
            let exit_code = result.exit_code;
            let msg = AgentMessage {
                payload: Some(agent_message::Payload::ScriptResult(result)),
            };
            if outbound.send(msg).await.is_err() {
                warn!(script_id = %cmd.script_id, "Session gone, discarding script result");
            } else {
                info!(script_id = %cmd.script_id, exit_code, "Script executed");
            }
        }
        Err(e) => warn!(script_id = %cmd.script_id, error = %e, "Error executing script"),
    }
}
