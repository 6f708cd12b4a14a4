// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tests for consul address resolution and the watch loop, against a stub
//! registry server.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vigil_discovery::{ConsulClient, DiscoveryError, ServiceCheck, ServiceRegistration};

#[derive(Clone, Default)]
struct StubState {
    entries: Arc<Mutex<Value>>,
    registered: Arc<Mutex<Vec<Value>>>,
}

async fn health_handler(State(state): State<StubState>) -> Json<Value> {
    Json(state.entries.lock().unwrap().clone())
}

async fn register_handler(State(state): State<StubState>, Json(body): Json<Value>) {
    state.registered.lock().unwrap().push(body);
}

async fn start_stub(entries: Value) -> (String, StubState) {
    let state = StubState {
        entries: Arc::new(Mutex::new(entries)),
        registered: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/v1/health/service/:name", get(health_handler))
        .route("/v1/agent/service/register", put(register_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (addr, state)
}

fn entry(service_addr: &str, node_addr: &str, port: u16) -> Value {
    json!({
        "Node": { "Address": node_addr },
        "Service": { "Address": service_addr, "Port": port },
    })
}

#[tokio::test]
async fn discover_prefers_the_service_address() {
    let (addr, _state) = start_stub(json!([entry("10.1.2.3", "10.9.9.9", 9090)])).await;
    let client = ConsulClient::new(&addr);

    let resolved = client.discover("vigil-controller").await.unwrap();
    assert_eq!(resolved, "10.1.2.3:9090");
}

#[tokio::test]
async fn discover_falls_back_to_the_node_address() {
    let (addr, _state) = start_stub(json!([entry("", "10.9.9.9", 9090)])).await;
    let client = ConsulClient::new(&addr);

    let resolved = client.discover("vigil-controller").await.unwrap();
    assert_eq!(resolved, "10.9.9.9:9090");
}

#[tokio::test]
async fn discover_fails_without_healthy_instances() {
    let (addr, _state) = start_stub(json!([])).await;
    let client = ConsulClient::new(&addr);

    let err = client.discover("vigil-controller").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::NoHealthyInstances(_)));
}

#[tokio::test]
async fn watch_emits_on_first_resolution_and_on_change() {
    let (addr, state) = start_stub(json!([entry("10.0.0.1", "", 9090)])).await;
    let client = ConsulClient::new(&addr).with_poll_interval(Duration::from_millis(20));

    let mut rx = client.watch("vigil-controller".to_string());

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first emission")
        .unwrap();
    assert_eq!(first, "10.0.0.1:9090");

    // Unchanged polls stay silent.
    let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(quiet.is_err());

    *state.entries.lock().unwrap() = json!([entry("10.0.0.2", "", 9090)]);

    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("second emission")
        .unwrap();
    assert_eq!(second, "10.0.0.2:9090");
}

#[tokio::test]
async fn register_sends_the_consul_payload() {
    let (addr, state) = start_stub(json!([])).await;
    let client = ConsulClient::new(&addr);

    client
        .register(&ServiceRegistration {
            id: "vigil-controller".to_string(),
            name: "vigil-controller".to_string(),
            address: "10.0.0.1".to_string(),
            port: 9090,
            tags: vec!["grpc".to_string()],
            check: ServiceCheck::grpc("10.0.0.1:9090"),
        })
        .await
        .unwrap();

    let registered = state.registered.lock().unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0]["ID"], "vigil-controller");
    assert_eq!(registered[0]["Port"], 9090);
    assert_eq!(registered[0]["Check"]["GRPC"], "10.0.0.1:9090");
    assert_eq!(registered[0]["Check"]["DeregisterCriticalServiceAfter"], "30s");
    // A gRPC check must not carry an HTTP probe.
    assert!(registered[0]["Check"].get("HTTP").is_none());
}
