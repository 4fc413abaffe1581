//! Server-facing HTTP handlers: the task poll/report API agents call.
//! Handler functions only — mounting on a `Router`, TLS termination, and
//! graceful shutdown are the binary's concern, not this adapter's.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GraphiumError;
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::TokenIssuer;
use crate::services::TaskQueueService;

#[derive(Clone)]
pub struct ServerApiState {
    pub task_queue: Arc<TaskQueueService>,
    pub token_issuer: Arc<dyn TokenIssuer>,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusBody {
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl From<GraphiumError> for ApiError {
    fn from(err: GraphiumError) -> Self {
        Self { error: err.to_string() }
    }
}

fn graphium_error_response(err: GraphiumError) -> (StatusCode, Json<ApiError>) {
    let status = StatusCode::from_u16(err.kind().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.into()))
}

/// Verifies `Authorization: Bearer <token>` binds to the `host_id` the route
/// names. Every handler below calls this first; there's no shared axum
/// middleware stack in scope here, so it's invoked explicitly per handler.
async fn authenticate(state: &ServerApiState, headers: &HeaderMap, host_id: &str) -> Result<(), (StatusCode, Json<ApiError>)> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| graphium_error_response(GraphiumError::Unauthorized("missing bearer token".to_string())))?;

    let claims = state
        .token_issuer
        .verify(token)
        .await
        .map_err(graphium_error_response)?;

    if claims.host_id != host_id {
        return Err(graphium_error_response(GraphiumError::Unauthorized(
            "token host_id does not match route".to_string(),
        )));
    }
    Ok(())
}

/// `GET /api/v1/agents/{host_id}/tasks?status=pending&limit=N`
pub async fn list_agent_tasks(
    State(state): State<ServerApiState>,
    Path(host_id): Path<String>,
    Query(query): Query<PollQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(response) = authenticate(&state, &headers, &host_id).await {
        return response.into_response();
    }

    match state.task_queue.poll(&host_id, query.limit).await {
        Ok(tasks) => {
            let tasks: Vec<Task> = match query.status.as_deref() {
                Some(status) => tasks.into_iter().filter(|t| t.status.as_str() == status).collect(),
                None => tasks,
            };
            Json(tasks).into_response()
        }
        Err(err) => graphium_error_response(err).into_response(),
    }
}

/// `PUT /api/v1/tasks/{task_id}/status`
pub async fn report_task_status(
    State(state): State<ServerApiState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReportStatusBody>,
) -> impl IntoResponse {
    // The reporting agent must own a valid token; the host_id bound to it
    // need not match the task's host_id here because retries can be
    // reassigned to a different agent's sibling after a reap.
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return graphium_error_response(GraphiumError::Unauthorized("missing bearer token".to_string()))
            .into_response();
    };
    if let Err(err) = state.token_issuer.verify(token).await {
        return graphium_error_response(err).into_response();
    }

    match state
        .task_queue
        .report_status(&task_id, body.status, body.error, body.result)
        .await
    {
        Ok(task) => Json(task).into_response(),
        Err(err) => graphium_error_response(err).into_response(),
    }
}
