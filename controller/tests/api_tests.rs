// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API tests: JSON shapes, status codes, and the script-creation
//! endpoint's store side effects.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use vigil_controller::application::{ScriptDispatcher, StreamRegistry};
use vigil_controller::domain::{HostHeartbeat, HostRepository};
use vigil_controller::infrastructure::repositories::{
    SqliteHostRepository, SqliteScriptRepository, SqliteTagRepository,
};
use vigil_controller::infrastructure::Database;
use vigil_controller::presentation::api::{self, AppState};

struct TestApi {
    base: String,
    hosts: Arc<dyn HostRepository>,
    http: reqwest::Client,
    _dir: TempDir,
}

async fn start_api() -> TestApi {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path().join("test.db"))
        .await
        .expect("open database");

    let hosts: Arc<dyn HostRepository> = Arc::new(SqliteHostRepository::new(db.pool().clone()));
    let registry = Arc::new(StreamRegistry::new());

    let state = Arc::new(AppState {
        db: db.clone(),
        hosts: hosts.clone(),
        scripts: Arc::new(SqliteScriptRepository::new(db.pool().clone())),
        tags: Arc::new(SqliteTagRepository::new(db.pool().clone())),
        dispatcher: Arc::new(ScriptDispatcher::new(registry)),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, api::app(state)).await.expect("serve");
    });

    TestApi {
        base: format!("http://{addr}"),
        hosts,
        http: reqwest::Client::new(),
        _dir: dir,
    }
}

fn heartbeat(hostname: &str) -> HostHeartbeat {
    HostHeartbeat {
        hostname: hostname.to_string(),
        ip: "10.0.0.1".to_string(),
        uptime_seconds: 3600,
        cpu_cores: 4,
        total_memory_bytes: 8 * 1024 * 1024 * 1024,
        total_storage_bytes: 100 * 1024 * 1024 * 1024,
        last_seen: Utc::now(),
    }
}

#[tokio::test]
async fn health_reports_connected_database() {
    let api = start_api().await;

    let response = api
        .http
        .get(format!("{}/api/v1/health", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn hosts_listing_and_detail() {
    let api = start_api().await;
    api.hosts.upsert_host(&heartbeat("h1")).await.unwrap();

    let body: Value = api
        .http
        .get(format!("{}/api/v1/hosts", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["hosts"][0]["hostname"], "h1");
    assert_eq!(body["hosts"][0]["online"], true);

    let detail: Value = api
        .http
        .get(format!("{}/api/v1/hosts/h1?limit=5", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["host"]["cpu_cores"], 4);
    assert!(detail["usage"].as_array().unwrap().is_empty());

    let missing = api
        .http
        .get(format!("{}/api/v1/hosts/ghost", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn stats_reflect_the_fleet() {
    let api = start_api().await;
    api.hosts.upsert_host(&heartbeat("h1")).await.unwrap();

    let stats: Value = api
        .http
        .get(format!("{}/api/v1/stats", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_hosts"], 1);
    assert_eq!(stats["online_hosts"], 1);
    assert_eq!(stats["total_cpu_cores"], 4);
    assert_eq!(stats["avg_cpu_percent"], 0.0);
}

#[tokio::test]
async fn script_lifecycle_over_http() {
    let api = start_api().await;

    let created = api
        .http
        .post(format!("{}/api/v1/scripts", api.base))
        .json(&json!({ "name": "job", "content": "#!/bin/sh\necho ok\n" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);

    let script: Value = created.json().await.unwrap();
    let id = script["id"].as_str().unwrap().to_string();
    assert_eq!(script["sha256_hash"].as_str().unwrap().len(), 64);

    let listing: Value = api
        .http
        .get(format!("{}/api/v1/scripts", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["count"], 1);

    let detail: Value = api
        .http
        .get(format!("{}/api/v1/scripts/{id}", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["script"]["name"], "job");
    assert!(detail["executions"].as_array().unwrap().is_empty());

    let deleted = api
        .http
        .delete(format!("{}/api/v1/scripts/{id}", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let missing = api
        .http
        .get(format!("{}/api/v1/scripts/{id}", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn script_creation_requires_name_and_content() {
    let api = start_api().await;

    let response = api
        .http
        .post(format!("{}/api/v1/scripts", api.base))
        .json(&json!({ "name": "", "content": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn host_tags_round_trip() {
    let api = start_api().await;
    api.hosts.upsert_host(&heartbeat("h1")).await.unwrap();

    let added = api
        .http
        .post(format!("{}/api/v1/hosts/tags", api.base))
        .json(&json!({ "hostname": "h1", "tag": "prod" }))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), 200);

    let tags: Value = api
        .http
        .get(format!("{}/api/v1/tags", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tags["count"], 1);
    assert_eq!(tags["tags"][0]["name"], "prod");

    let detail: Value = api
        .http
        .get(format!("{}/api/v1/hosts/h1", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["tags"][0]["name"], "prod");

    let removed = api
        .http
        .delete(format!("{}/api/v1/hosts/tags", api.base))
        .json(&json!({ "hostname": "h1", "tag": "prod" }))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), 200);

    // Tagging a host that never heartbeated is a 404.
    let ghost = api
        .http
        .post(format!("{}/api/v1/hosts/tags", api.base))
        .json(&json!({ "hostname": "ghost", "tag": "prod" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ghost.status(), 404);
}
