//! Agent-side HTTP client: polls the server's task API and reports status,
//! the agent-process counterpart to `server_api`'s handlers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{Task, TaskStatus};
use crate::services::agent_runtime::poll_loop::TaskSource;

pub struct AgentClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> GraphiumResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GraphiumError::Transient(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url: base_url.into(), token: token.into() })
    }

    /// `GET /api/v1/agents/{host_id}/tasks?status=pending&limit=N`
    pub async fn poll_tasks(&self, host_id: &str, limit: usize) -> GraphiumResult<Vec<Task>> {
        let url = format!("{}/api/v1/agents/{host_id}/tasks", self.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("status", "pending"), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(|e| GraphiumError::Transient(format!("poll request failed: {e}")))?;

        response_to_result(response).await
    }

    /// `PUT /api/v1/tasks/{task_id}/status`
    pub async fn report_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<String>,
        result: Option<Value>,
    ) -> GraphiumResult<Task> {
        let url = format!("{}/api/v1/tasks/{task_id}/status", self.base_url);
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "status": status, "error": error, "result": result }))
            .send()
            .await
            .map_err(|e| GraphiumError::Transient(format!("status report failed: {e}")))?;

        response_to_result(response).await
    }
}

/// Lets `AgentPollLoop` drive a standalone agent process over HTTP using
/// the exact same poll/report cadence a co-located `TaskQueueService` would.
#[async_trait]
impl TaskSource for AgentClient {
    async fn poll(&self, host_id: &str, limit: usize) -> GraphiumResult<Vec<Task>> {
        self.poll_tasks(host_id, limit).await
    }

    async fn report_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<String>,
        result: Option<Value>,
    ) -> GraphiumResult<Task> {
        self.report_status(task_id, status, error, result).await
    }
}

async fn response_to_result<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> GraphiumResult<T> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GraphiumError::Unauthorized("server rejected agent bearer token".to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GraphiumError::Transient(format!("server responded {status}: {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| GraphiumError::Serialization(format!("malformed server response: {e}")))
}
