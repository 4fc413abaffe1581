//! Agent sidecar HTTP: local read-only inspection plus the semantic-action
//! dispatch endpoint, mounted by the agent binary next to its poll loop.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GraphiumError;
use crate::domain::models::{ControlAction, TaskKind};
use crate::domain::ports::{LogOptions, Runtime};
use crate::services::agent_runtime::handlers::{self, HandlerContext};
use crate::services::agent_runtime::poll_loop::AgentStats;

#[derive(Clone)]
pub struct SidecarApiState {
    pub host_id: String,
    pub datacenter: Option<String>,
    pub runtime: Arc<dyn Runtime>,
    pub stats: Arc<AgentStats>,
    pub handler_ctx: HandlerContext,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub host_id: String,
    pub datacenter: Option<String>,
    pub uptime: i64,
    pub sync_count: u64,
    pub failed_syncs: u64,
    pub events_count: u64,
    pub last_sync: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_duration_ms: u64,
}

/// `GET /health`
pub async fn health(State(state): State<SidecarApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        host_id: state.host_id.clone(),
        datacenter: state.datacenter.clone(),
        uptime: state.stats.uptime_seconds(),
        sync_count: state.stats.sync_count.load(std::sync::atomic::Ordering::Relaxed),
        failed_syncs: state.stats.failed_syncs.load(std::sync::atomic::Ordering::Relaxed),
        events_count: state.stats.events_count.load(std::sync::atomic::Ordering::Relaxed),
        last_sync: state.stats.last_sync(),
        last_sync_duration_ms: state.stats.last_sync_duration_ms(),
    })
}

fn error_response(err: GraphiumError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.kind().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// `GET /containers`
pub async fn list_containers(State(state): State<SidecarApiState>) -> impl IntoResponse {
    match state.runtime.list().await {
        Ok(containers) => Json(serde_json::json!({
            "host_id": state.host_id,
            "datacenter": state.datacenter,
            "count": containers.len(),
            "containers": containers,
        }))
        .into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// `GET /containers/{id}`
pub async fn inspect_container(State(state): State<SidecarApiState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.runtime.inspect(&id).await {
        Ok(info) => Json(info).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub follow: bool,
    #[serde(default)]
    pub tail: Option<usize>,
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub timestamps: bool,
}

const FOLLOW_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);
/// Length of the runtime's per-read framing header (stream type + reserved
/// bytes + big-endian payload length) that must never reach the client.
const RUNTIME_FRAME_HEADER_LEN: usize = 8;

/// Strips the runtime's framing prefix from one read's worth of log bytes.
/// A read shorter than the header is treated as empty rather than leaking
/// a partial header.
fn strip_framing(mut chunk: Vec<u8>) -> Vec<u8> {
    if chunk.len() > RUNTIME_FRAME_HEADER_LEN {
        chunk.drain(..RUNTIME_FRAME_HEADER_LEN);
        chunk
    } else {
        Vec::new()
    }
}

/// `GET /containers/{id}/logs?follow=&tail=&since=&timestamps=`
///
/// Non-following requests return the full buffered slice the `Runtime`
/// reports. Following requests re-poll on an interval and stream only the
/// bytes observed since the previous poll — the underlying `Runtime::logs`
/// has no native tail-follow primitive, so this adapter builds one. Every
/// read's runtime framing header is stripped before it reaches the client.
pub async fn container_logs(
    State(state): State<SidecarApiState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let options = LogOptions {
        follow: false,
        tail: query.tail,
        since: query.since,
        timestamps: query.timestamps,
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert("X-Container-ID", value);
    }
    if let Ok(value) = HeaderValue::from_str(&state.host_id) {
        headers.insert("X-Host-ID", value);
    }
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));

    if !query.follow {
        return match state.runtime.logs(&id, &options).await {
            Ok(bytes) => (StatusCode::OK, headers, strip_framing(bytes)).into_response(),
            Err(err) => error_response(err).into_response(),
        };
    }

    let runtime = state.runtime.clone();
    let body = Body::from_stream(stream::unfold(
        (runtime, id, query.timestamps, query.since),
        move |(runtime, id, timestamps, mut since)| async move {
            tokio::time::sleep(FOLLOW_POLL_INTERVAL).await;
            let options = LogOptions { follow: false, tail: None, since, timestamps };
            let chunk = runtime.logs(&id, &options).await.unwrap_or_default();
            since = Some(chrono::Utc::now());
            Some((Ok::<_, std::io::Error>(strip_framing(chunk)), (runtime, id, timestamps, since)))
        },
    ));

    (StatusCode::OK, headers, body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SemanticActionObject {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct SemanticActionInstrument {
    pub name: String,
}

/// `{type, object:{identifier}, instrument?:{name}, properties?}`, mapped to
/// `control`/`deploy`/`delete`/`check` task kinds and run inline against the
/// local handler table rather than queued, since this is the sidecar's own
/// host acting on itself.
#[derive(Debug, Deserialize)]
pub struct SemanticAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub object: SemanticActionObject,
    #[serde(default)]
    pub instrument: Option<SemanticActionInstrument>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// `POST /v1/api/semantic/action`
pub async fn semantic_action(
    State(state): State<SidecarApiState>,
    Json(action): Json<SemanticAction>,
) -> impl IntoResponse {
    let (kind, payload) = match action.action_type.as_str() {
        "control" => {
            let control_action = action
                .instrument
                .as_ref()
                .and_then(|i| match i.name.as_str() {
                    "start" => Some(ControlAction::Start),
                    "stop" => Some(ControlAction::Stop),
                    "restart" => Some(ControlAction::Restart),
                    "pause" => Some(ControlAction::Pause),
                    "unpause" => Some(ControlAction::Unpause),
                    _ => None,
                })
                .unwrap_or(ControlAction::Restart);
            (
                TaskKind::Control,
                serde_json::json!({ "container_id": action.object.identifier, "action": control_action }),
            )
        }
        "deploy" => (TaskKind::Deploy, action.properties.clone()),
        "delete" => (
            TaskKind::Delete,
            serde_json::json!({ "container_id": action.object.identifier }),
        ),
        "check" => (TaskKind::Check, action.properties.clone()),
        other => {
            return error_response(GraphiumError::Validation(format!("unsupported semantic action type: {other}")))
                .into_response()
        }
    };

    match handlers::dispatch(&state.handler_ctx, kind, &payload).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}
