// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP read API: a thin JSON layer over the store for operators, plus the
//! script-creation endpoint that triggers fan-out over live agent streams.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::dispatch::ScriptDispatcher;
use crate::domain::repository::{HostRepository, RepositoryError, ScriptRepository, TagRepository};
use crate::domain::script::{Script, ScriptId};
use crate::infrastructure::db::Database;

pub struct AppState {
    pub db: Database,
    pub hosts: Arc<dyn HostRepository>,
    pub scripts: Arc<dyn ScriptRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub dispatcher: Arc<ScriptDispatcher>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/hosts", get(list_hosts))
        .route("/api/v1/hosts/tags", post(add_host_tag).delete(remove_host_tag))
        .route("/api/v1/hosts/:hostname", get(get_host))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/health", get(get_health))
        .route("/api/v1/scripts", get(list_scripts).post(create_script))
        .route("/api/v1/scripts/:id", get(get_script).delete(delete_script))
        .route("/api/v1/tags", get(list_tags))
        .with_state(state)
}

fn internal_error(context: &str, err: RepositoryError) -> (StatusCode, Json<serde_json::Value>) {
    error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

async fn list_hosts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.hosts.get_all_hosts().await {
        Ok(hosts) => {
            let count = hosts.len();
            (
                StatusCode::OK,
                Json(json!({ "hosts": hosts, "count": count })),
            )
        }
        Err(e) => internal_error("Error getting hosts", e),
    }
}

#[derive(Deserialize)]
struct UsageQuery {
    limit: Option<i64>,
}

async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(hostname): Path<String>,
    Query(query): Query<UsageQuery>,
) -> impl IntoResponse {
    let host = match state.hosts.get_host(&hostname).await {
        Ok(Some(host)) => host,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Host not found" })),
            )
        }
        Err(e) => return internal_error("Error getting host", e),
    };

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let usage = match state.hosts.get_host_usage(&hostname, limit).await {
        Ok(usage) => usage,
        Err(e) => return internal_error("Error getting host usage", e),
    };

    let tags = match state.tags.get_host_tags(&hostname).await {
        Ok(tags) => tags,
        Err(e) => {
            warn!(%hostname, error = %e, "Error getting host tags");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(json!({ "host": host, "usage": usage, "tags": tags })),
    )
}

async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.hosts.get_cluster_stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))),
        Err(e) => internal_error("Error getting cluster stats", e),
    }
}

async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": e.to_string() })),
        ),
    }
}

async fn list_scripts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scripts.get_all_scripts().await {
        Ok(scripts) => {
            let count = scripts.len();
            (
                StatusCode::OK,
                Json(json!({ "scripts": scripts, "count": count })),
            )
        }
        Err(e) => internal_error("Error getting scripts", e),
    }
}

#[derive(Deserialize)]
struct CreateScriptRequest {
    name: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_script(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateScriptRequest>,
) -> impl IntoResponse {
    if req.name.is_empty() || req.content.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Name and content are required" })),
        );
    }

    let script = Script::new(req.name, req.content);
    if let Err(e) = state.scripts.create_script(&script).await {
        error!(error = %e, "Error creating script");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to create script" })),
        );
    }

    let targets = if req.tags.is_empty() {
        state.hosts.get_all_hosts().await
    } else {
        state.tags.get_hosts_by_tags(&req.tags).await
    };

    match targets {
        Ok(hosts) => {
            state.dispatcher.distribute(&script, &hosts).await;
        }
        Err(e) => {
            // The script exists either way; distribution is best-effort.
            error!(error = %e, "Error getting hosts for script distribution");
        }
    }

    (StatusCode::CREATED, Json(json!(script)))
}

async fn get_script(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid script ID" })),
        );
    };
    let id = ScriptId(id);

    let script = match state.scripts.get_script(id).await {
        Ok(Some(script)) => script,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Script not found" })),
            )
        }
        Err(e) => return internal_error("Error getting script", e),
    };

    let executions = match state.scripts.get_executions(id).await {
        Ok(executions) => executions,
        Err(e) => {
            warn!(script_id = %id, error = %e, "Error getting executions");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(json!({ "script": script, "executions": executions })),
    )
}

async fn delete_script(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid script ID" })),
        );
    };

    match state.scripts.delete_script(ScriptId(id)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Script deleted successfully" })),
        ),
        Err(e) => internal_error("Error deleting script", e),
    }
}

async fn list_tags(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.tags.get_all_tags().await {
        Ok(tags) => {
            let count = tags.len();
            (StatusCode::OK, Json(json!({ "tags": tags, "count": count })))
        }
        Err(e) => internal_error("Error getting tags", e),
    }
}

#[derive(Deserialize)]
struct HostTagRequest {
    hostname: String,
    tag: String,
}

async fn add_host_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HostTagRequest>,
) -> impl IntoResponse {
    if req.hostname.is_empty() || req.tag.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Hostname and tag are required" })),
        );
    }

    match state.tags.add_host_tag(&req.hostname, &req.tag).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Tag added successfully" })),
        ),
        Err(RepositoryError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Host not found" })),
        ),
        Err(e) => internal_error("Error adding tag to host", e),
    }
}

async fn remove_host_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HostTagRequest>,
) -> impl IntoResponse {
    if req.hostname.is_empty() || req.tag.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Hostname and tag are required" })),
        );
    }

    match state.tags.remove_host_tag(&req.hostname, &req.tag).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Tag removed successfully" })),
        ),
        Err(e) => internal_error("Error removing tag from host", e),
    }
}
