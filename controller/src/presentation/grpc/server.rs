// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! gRPC session protocol for agent streams.
//!
//! Implements the `MetricsCollector` service: each accepted `StreamMetrics`
//! call becomes one long-lived session task that processes ingress frames in
//! order. A `Metrics` frame is persisted (upsert + usage append) and
//! acknowledged before the next frame is read; a `ScriptResult` frame is
//! recorded and never acknowledged. The first successfully processed metrics
//! frame binds the session to its hostname and registers the outbound handle
//! so the dispatcher can reach this host.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{info, warn};
use uuid::Uuid;

use vigil_proto::metrics_collector_server::{MetricsCollector, MetricsCollectorServer};
use vigil_proto::{
    agent_message, controller_message, Acknowledgment, AgentMessage, ControllerMessage,
    HostMetrics, ScriptResult, MAX_FRAME_BYTES,
};

use crate::application::registry::{OutboundHandle, StreamRegistry};
use crate::domain::host::{HostHeartbeat, UsageSample};
use crate::domain::repository::{HostRepository, ScriptRepository};
use crate::domain::script::{NewExecution, ScriptId};

/// Implementation of the `MetricsCollector` gRPC service.
pub struct CollectorService {
    hosts: Arc<dyn HostRepository>,
    scripts: Arc<dyn ScriptRepository>,
    registry: Arc<StreamRegistry>,
}

impl CollectorService {
    pub fn new(
        hosts: Arc<dyn HostRepository>,
        scripts: Arc<dyn ScriptRepository>,
        registry: Arc<StreamRegistry>,
    ) -> Self {
        Self {
            hosts,
            scripts,
            registry,
        }
    }

    /// Create a gRPC server instance with the frame-size ceiling applied.
    pub fn into_server(self) -> MetricsCollectorServer<Self> {
        MetricsCollectorServer::new(self)
            .max_decoding_message_size(MAX_FRAME_BYTES)
            .max_encoding_message_size(MAX_FRAME_BYTES)
    }
}

#[tonic::async_trait]
impl MetricsCollector for CollectorService {
    type StreamMetricsStream = ReceiverStream<Result<ControllerMessage, Status>>;

    async fn stream_metrics(
        &self,
        request: Request<Streaming<AgentMessage>>,
    ) -> Result<Response<Self::StreamMetricsStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(64);

        info!("New agent connected");

        let session = Session {
            hosts: self.hosts.clone(),
            scripts: self.scripts.clone(),
            registry: self.registry.clone(),
            outbound: tx,
        };
        tokio::spawn(session.run(inbound));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// One accepted agent stream. Owns the outbound handle and the receive loop;
/// teardown releases the registry slot if this session still holds it.
struct Session {
    hosts: Arc<dyn HostRepository>,
    scripts: Arc<dyn ScriptRepository>,
    registry: Arc<StreamRegistry>,
    outbound: OutboundHandle,
}

impl Session {
    async fn run(self, mut inbound: Streaming<AgentMessage>) {
        let mut hostname: Option<String> = None;

        loop {
            let msg = match inbound.message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("Agent closed stream");
                    break;
                }
                Err(e) => {
                    info!(error = %e, "Agent disconnected");
                    break;
                }
            };

            match msg.payload {
                Some(agent_message::Payload::Metrics(metrics)) => {
                    if !self.handle_metrics_frame(&mut hostname, metrics).await {
                        break;
                    }
                }
                Some(agent_message::Payload::ScriptResult(result)) => {
                    self.handle_result_frame(hostname.as_deref(), result).await;
                }
                None => warn!("Agent message without payload"),
            }
        }

        if let Some(hostname) = hostname {
            self.registry.deregister(&hostname, &self.outbound).await;
        }
    }

    /// Persist one metrics frame and acknowledge it. Returns false when the
    /// ack can no longer be delivered, which terminates the session.
    async fn handle_metrics_frame(
        &self,
        hostname: &mut Option<String>,
        metrics: HostMetrics,
    ) -> bool {
        let ack = match self.persist_metrics(&metrics).await {
            Ok(()) => {
                if hostname.is_none() {
                    *hostname = Some(metrics.hostname.clone());
                    self.registry
                        .register(&metrics.hostname, self.outbound.clone())
                        .await;
                }
                Acknowledgment {
                    success: true,
                    message: "received".to_string(),
                }
            }
            Err(e) => {
                warn!(hostname = %metrics.hostname, error = %e, "Error handling metrics");
                Acknowledgment {
                    success: false,
                    message: e.to_string(),
                }
            }
        };

        let frame = ControllerMessage {
            payload: Some(controller_message::Payload::Ack(ack)),
        };
        self.outbound.send(Ok(frame)).await.is_ok()
    }

    async fn persist_metrics(&self, metrics: &HostMetrics) -> anyhow::Result<()> {
        let (info, usage) = match (&metrics.info, &metrics.usage) {
            (Some(info), Some(usage)) => (info, usage),
            _ => return Err(anyhow!("missing info or usage data")),
        };

        let timestamp = DateTime::<Utc>::from_timestamp(metrics.timestamp, 0)
            .ok_or_else(|| anyhow!("invalid timestamp: {}", metrics.timestamp))?;

        let heartbeat = HostHeartbeat {
            hostname: metrics.hostname.clone(),
            ip: metrics.ip.clone(),
            uptime_seconds: info.uptime_seconds,
            cpu_cores: info.cpu_cores,
            total_memory_bytes: info.total_memory_bytes,
            total_storage_bytes: info.total_storage_bytes,
            last_seen: timestamp,
        };

        let host_id = self
            .hosts
            .upsert_host(&heartbeat)
            .await
            .context("upsert host")?;

        let sample = UsageSample {
            host_id,
            timestamp,
            cpu_percent: usage.cpu_percent,
            used_memory_bytes: usage.used_memory_bytes,
            used_storage_bytes: usage.used_storage_bytes,
        };

        self.hosts
            .insert_usage(&sample)
            .await
            .context("insert usage")?;

        Ok(())
    }

    /// Record a script outcome. Results are not acknowledged; errors are
    /// logged and the session continues.
    async fn handle_result_frame(&self, hostname: Option<&str>, result: ScriptResult) {
        let Some(hostname) = hostname else {
            warn!(script_id = %result.script_id, "Script result before any metrics frame");
            return;
        };

        if let Err(e) = self.record_result(hostname, &result).await {
            warn!(hostname, script_id = %result.script_id, error = %e, "Error handling script result");
        } else {
            info!(
                script_id = %result.script_id,
                hostname,
                exit_code = result.exit_code,
                "Script executed on host"
            );
        }
    }

    async fn record_result(&self, hostname: &str, result: &ScriptResult) -> anyhow::Result<()> {
        let host = self
            .hosts
            .get_host(hostname)
            .await
            .context("get host")?
            .ok_or_else(|| anyhow!("unknown host {hostname}"))?;

        let script_id = Uuid::parse_str(&result.script_id).context("parse script id")?;
        let executed_at = DateTime::<Utc>::from_timestamp(result.executed_at, 0)
            .ok_or_else(|| anyhow!("invalid timestamp: {}", result.executed_at))?;

        let execution = NewExecution {
            script_id: ScriptId(script_id),
            host_id: host.id,
            sha256_hash: result.sha256_hash.clone(),
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            executed_at,
        };

        self.scripts
            .record_execution(&execution)
            .await
            .context("record execution")?;

        Ok(())
    }
}
