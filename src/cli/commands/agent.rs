//! `graphium agent`: a standalone per-host process. Runs the poll loop
//! against the server's task API over HTTP and serves the sidecar
//! inspection/semantic-action routes locally.
//!
//! The concrete container engine a real deployment drives is out of scope
//! here (see SPEC_FULL.md §1 non-goals); this wires the in-memory `Runtime`
//! fake so the poll loop, handler table, and sidecar routes are fully live
//! end to end against whatever `Runtime` a caller substitutes in-process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::adapters::http::sidecar_api::{self, SidecarApiState};
use crate::adapters::http::AgentClient;
use crate::adapters::memory::FakeRuntime;
use crate::domain::ports::Runtime;
use crate::services::agent_runtime::poll_loop::{AgentStats, TaskSource};
use crate::services::agent_runtime::{AgentPollLoop, HandlerContext};

pub async fn handle(host_id: String, api_url: String, runtime_endpoint: String, token: String, sidecar_port: u16) -> Result<()> {
    info!(host_id = %host_id, runtime_endpoint = %runtime_endpoint, "agent starting");

    let runtime: Arc<dyn Runtime> = Arc::new(FakeRuntime::new());
    let handler_ctx = HandlerContext { runtime: runtime.clone(), log_collection_dir: std::env::temp_dir() };
    let stats = Arc::new(AgentStats::new());

    let client = Arc::new(AgentClient::new(api_url, token).context("failed to build agent HTTP client")?);
    let task_source: Arc<dyn TaskSource> = client;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let poll_loop = AgentPollLoop {
        host_id: host_id.clone(),
        poll_interval: Duration::from_secs(5),
        task_queue: task_source,
        handler_ctx: handler_ctx.clone(),
        stats: stats.clone(),
    };
    let poll_handle = tokio::spawn(async move { poll_loop.run(shutdown_rx).await });

    let sidecar_state = SidecarApiState { host_id, datacenter: None, runtime, stats, handler_ctx };
    let app = Router::new()
        .route("/health", get(sidecar_api::health))
        .route("/containers", get(sidecar_api::list_containers))
        .route("/containers/:id", get(sidecar_api::inspect_container))
        .route("/containers/:id/logs", get(sidecar_api::container_logs))
        .route("/v1/api/semantic/action", post(sidecar_api::semantic_action))
        .with_state(sidecar_state);

    let bind_address = format!("0.0.0.0:{sidecar_port}");
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind sidecar port {sidecar_port}"))?;
    info!(bind_address = %bind_address, "agent sidecar listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("agent sidecar server loop failed")?;

    let _ = shutdown_tx.send(true);
    let _ = poll_handle.await;
    Ok(())
}
