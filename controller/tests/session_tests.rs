// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end tests for the duplex session protocol: heartbeat round-trips,
//! protocol violations, script result recording and dispatcher fan-out,
//! driven against an in-process gRPC server with raw wire clients.

use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Request, Streaming};

use vigil_controller::application::{ScriptDispatcher, StreamRegistry};
use vigil_controller::domain::{HostHeartbeat, HostRepository, Script, ScriptRepository};
use vigil_controller::infrastructure::repositories::{
    SqliteHostRepository, SqliteScriptRepository,
};
use vigil_controller::infrastructure::Database;
use vigil_controller::presentation::grpc::CollectorService;

use vigil_proto::metrics_collector_client::MetricsCollectorClient;
use vigil_proto::{
    agent_message, controller_message, AgentMessage, ControllerMessage, HostInfo, HostMetrics,
    ResourceUsage, ScriptResult,
};

struct TestController {
    addr: String,
    hosts: Arc<dyn HostRepository>,
    scripts: Arc<dyn ScriptRepository>,
    registry: Arc<StreamRegistry>,
    _dir: TempDir,
}

async fn start_controller() -> TestController {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path().join("test.db"))
        .await
        .expect("open database");

    let hosts: Arc<dyn HostRepository> = Arc::new(SqliteHostRepository::new(db.pool().clone()));
    let scripts: Arc<dyn ScriptRepository> =
        Arc::new(SqliteScriptRepository::new(db.pool().clone()));
    let registry = Arc::new(StreamRegistry::new());

    let service =
        CollectorService::new(hosts.clone(), scripts.clone(), registry.clone()).into_server();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("serve");
    });

    TestController {
        addr,
        hosts,
        scripts,
        registry,
        _dir: dir,
    }
}

async fn connect_agent(
    addr: &str,
) -> (mpsc::Sender<AgentMessage>, Streaming<ControllerMessage>) {
    let mut client = MetricsCollectorClient::connect(format!("http://{addr}"))
        .await
        .expect("connect");

    let (tx, rx) = mpsc::channel(8);
    let inbound = client
        .stream_metrics(Request::new(ReceiverStream::new(rx)))
        .await
        .expect("open stream")
        .into_inner();

    (tx, inbound)
}

fn metrics_frame(hostname: &str) -> AgentMessage {
    AgentMessage {
        payload: Some(agent_message::Payload::Metrics(HostMetrics {
            hostname: hostname.to_string(),
            ip: "10.0.0.1".to_string(),
            timestamp: Utc::now().timestamp(),
            info: Some(HostInfo {
                uptime_seconds: 3600,
                cpu_cores: 4,
                total_memory_bytes: 8 * 1024 * 1024 * 1024,
                total_storage_bytes: 100 * 1024 * 1024 * 1024,
            }),
            usage: Some(ResourceUsage {
                cpu_percent: 25.0,
                used_memory_bytes: 4 * 1024 * 1024 * 1024,
                used_storage_bytes: 50 * 1024 * 1024 * 1024,
            }),
        })),
    }
}

async fn next_ack(inbound: &mut Streaming<ControllerMessage>) -> vigil_proto::Acknowledgment {
    let msg = inbound
        .message()
        .await
        .expect("receive")
        .expect("stream open");
    match msg.payload {
        Some(controller_message::Payload::Ack(ack)) => ack,
        other => panic!("expected ack, got {other:?}"),
    }
}

async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn heartbeat_round_trip_persists_and_acks() {
    let controller = start_controller().await;
    let (tx, mut inbound) = connect_agent(&controller.addr).await;

    tx.send(metrics_frame("h1")).await.unwrap();

    let ack = next_ack(&mut inbound).await;
    assert!(ack.success);
    assert_eq!(ack.message, "received");

    let host = controller.hosts.get_host("h1").await.unwrap().unwrap();
    assert_eq!(host.ip, "10.0.0.1");
    assert_eq!(host.cpu_cores, 4);
    assert_eq!(host.total_memory_bytes, 8 * 1024 * 1024 * 1024);
    assert!(host.online);

    let usage = controller.hosts.get_host_usage("h1", 10).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].cpu_percent, 25.0);
}

#[tokio::test]
async fn invalid_frame_is_nacked_and_session_survives() {
    let controller = start_controller().await;
    let (tx, mut inbound) = connect_agent(&controller.addr).await;

    let mut broken = metrics_frame("h1");
    if let Some(agent_message::Payload::Metrics(metrics)) = broken.payload.as_mut() {
        metrics.info = None;
    }
    tx.send(broken).await.unwrap();

    let ack = next_ack(&mut inbound).await;
    assert!(!ack.success);
    assert!(!ack.message.is_empty());
    assert!(controller.hosts.get_host("h1").await.unwrap().is_none());

    // The session is still open: a valid frame goes through unaffected.
    tx.send(metrics_frame("h1")).await.unwrap();
    let ack = next_ack(&mut inbound).await;
    assert!(ack.success);
    assert!(controller.hosts.get_host("h1").await.unwrap().is_some());
}

#[tokio::test]
async fn script_results_are_recorded_against_the_bound_host() {
    let controller = start_controller().await;
    let (tx, mut inbound) = connect_agent(&controller.addr).await;

    tx.send(metrics_frame("h1")).await.unwrap();
    assert!(next_ack(&mut inbound).await.success);

    let script = Script::new("job", "#!/bin/sh\necho ok\n");
    controller.scripts.create_script(&script).await.unwrap();

    tx.send(AgentMessage {
        payload: Some(agent_message::Payload::ScriptResult(ScriptResult {
            script_id: script.id.to_string(),
            sha256_hash: script.sha256_hash.clone(),
            exit_code: 0,
            stdout: "ok\n".to_string(),
            stderr: String::new(),
            executed_at: Utc::now().timestamp(),
        })),
    })
    .await
    .unwrap();

    let scripts = controller.scripts.clone();
    let script_id = script.id;
    eventually("execution to be recorded", || {
        let scripts = scripts.clone();
        async move { scripts.get_executions(script_id).await.unwrap().len() == 1 }
    })
    .await;

    let executions = controller.scripts.get_executions(script.id).await.unwrap();
    assert_eq!(executions[0].exit_code, 0);
    assert_eq!(executions[0].stdout, "ok\n");
    assert_eq!(executions[0].hostname.as_deref(), Some("h1"));
    assert!(controller
        .scripts
        .has_executed("h1", &script.sha256_hash)
        .await
        .unwrap());
}

#[tokio::test]
async fn dispatcher_reaches_only_online_hosts_with_live_streams() {
    let controller = start_controller().await;

    // h1 heartbeats over a live session.
    let (tx, mut inbound) = connect_agent(&controller.addr).await;
    tx.send(metrics_frame("h1")).await.unwrap();
    assert!(next_ack(&mut inbound).await.success);

    // h2 exists but has no live stream; h3 is offline.
    controller
        .hosts
        .upsert_host(&HostHeartbeat {
            hostname: "h2".to_string(),
            ip: "10.0.0.2".to_string(),
            uptime_seconds: 1,
            cpu_cores: 2,
            total_memory_bytes: 1,
            total_storage_bytes: 1,
            last_seen: Utc::now(),
        })
        .await
        .unwrap();
    controller
        .hosts
        .upsert_host(&HostHeartbeat {
            hostname: "h3".to_string(),
            ip: "10.0.0.3".to_string(),
            uptime_seconds: 1,
            cpu_cores: 2,
            total_memory_bytes: 1,
            total_storage_bytes: 1,
            last_seen: Utc::now() - Duration::seconds(300),
        })
        .await
        .unwrap();
    controller
        .hosts
        .mark_inactive(Duration::seconds(60))
        .await
        .unwrap();

    let script = Script::new("job", "#!/bin/sh\necho ok\n");
    controller.scripts.create_script(&script).await.unwrap();

    let dispatcher = ScriptDispatcher::new(controller.registry.clone());
    let targets = controller.hosts.get_all_hosts().await.unwrap();
    let delivered = dispatcher.distribute(&script, &targets).await;
    assert_eq!(delivered, 1);

    let msg = inbound.message().await.unwrap().unwrap();
    match msg.payload {
        Some(controller_message::Payload::ScriptCommand(cmd)) => {
            assert_eq!(cmd.script_id, script.id.to_string());
            assert_eq!(cmd.sha256_hash, script.sha256_hash);
            assert_eq!(cmd.content, script.content);
        }
        other => panic!("expected script command, got {other:?}"),
    }
}

#[tokio::test]
async fn newer_session_takes_over_the_registry_slot() {
    let controller = start_controller().await;

    let (tx1, mut inbound1) = connect_agent(&controller.addr).await;
    tx1.send(metrics_frame("h1")).await.unwrap();
    assert!(next_ack(&mut inbound1).await.success);

    let (tx2, mut inbound2) = connect_agent(&controller.addr).await;
    tx2.send(metrics_frame("h1")).await.unwrap();
    assert!(next_ack(&mut inbound2).await.success);

    assert_eq!(controller.registry.len().await, 1);

    let script = Script::new("job", "#!/bin/sh\necho ok\n");
    controller.scripts.create_script(&script).await.unwrap();

    let dispatcher = ScriptDispatcher::new(controller.registry.clone());
    let targets = controller.hosts.get_all_hosts().await.unwrap();
    assert_eq!(dispatcher.distribute(&script, &targets).await, 1);

    // The command lands on the newer session.
    let msg = inbound2.message().await.unwrap().unwrap();
    assert!(matches!(
        msg.payload,
        Some(controller_message::Payload::ScriptCommand(_))
    ));
}

#[tokio::test]
async fn disconnect_removes_the_registry_slot() {
    let controller = start_controller().await;
    let (tx, mut inbound) = connect_agent(&controller.addr).await;

    tx.send(metrics_frame("h1")).await.unwrap();
    assert!(next_ack(&mut inbound).await.success);
    assert_eq!(controller.registry.len().await, 1);

    // Closing the agent's send half ends the session server-side.
    drop(tx);

    let registry = controller.registry.clone();
    eventually("registry slot to be removed", || {
        let registry = registry.clone();
        async move { registry.is_empty().await }
    })
    .await;
}
