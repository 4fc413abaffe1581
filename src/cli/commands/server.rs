//! `graphium server`: mounts the task-queue HTTP API and starts the Agent
//! Process Supervisor. Owns the `axum::Router`, TLS is left to a reverse
//! proxy in front of this process (see SPEC_FULL.md §1 non-goals).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, put};
use axum::Router;
use tracing::info;

use crate::adapters::http::server_api::{self, ServerApiState};
use crate::cli::commands::context::AppContext;
use crate::services::{StackOrchestrator, Supervisor, TaskQueueService};

pub async fn handle(ctx: AppContext, bind_override: Option<String>) -> Result<()> {
    let bind_address = bind_override.unwrap_or(ctx.config.server.bind_address.clone());

    let task_queue = Arc::new(TaskQueueService::new(ctx.db.tasks.clone()));
    let state = ServerApiState { task_queue: task_queue.clone(), token_issuer: ctx.token_issuer.clone() };

    let app = Router::new()
        .route("/api/v1/agents/:host_id/tasks", get(server_api::list_agent_tasks))
        .route("/api/v1/tasks/:task_id/status", put(server_api::report_task_status))
        .with_state(state);

    let supervisor = Arc::new(Supervisor::new(
        ctx.db.agent_configs.clone(),
        ctx.token_issuer.clone(),
        PathBuf::from(&ctx.config.supervisor.logs_dir),
        ctx.config.supervisor.agent_binary_path.clone(),
        format!("http://{bind_address}"),
    ));
    supervisor.start().await.context("failed to start agent process supervisor")?;

    // Background reaper for tasks whose agent stopped reporting mid-run.
    let reaper_queue = task_queue.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            ticker.tick().await;
            if let Err(e) = reaper_queue.reap_expired().await {
                tracing::warn!(error = %e, "task reaper iteration failed");
            }
        }
    });

    // Unused by the HTTP surface today but wired so `stack deploy` issued
    // from another process shares the same orchestrator construction path
    // the binary would use if it grew an in-process deploy endpoint.
    let _orchestrator = StackOrchestrator::new(
        task_queue,
        ctx.db.stacks.clone(),
        ctx.db.deployment_states.clone(),
        std::collections::HashMap::new(),
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(bind_address = %bind_address, "graphium server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server loop failed")?;

    supervisor.stop().await.context("failed to stop agent supervisor cleanly")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
