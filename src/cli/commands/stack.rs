//! `graphium stack`: parse a stack graph file, plan placements, and drive
//! the orchestrator's deploy/stop/remove operations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::commands::context::AppContext;
use crate::cli::output;
use crate::domain::models::{
    DeploymentConfig, DeploymentMode, HostCandidate, NetworkMode, PlacementStrategy, Stack,
};
use crate::domain::ports::{ListFilter, Store};
use crate::services::orchestrator::{StackGraph, StackGraphDocument};
use crate::services::{StackOrchestrator, TaskQueueService};

/// The server doesn't yet collect live host capacity metrics (no sidecar
/// endpoint reports it — see DESIGN.md), so every registered agent is
/// offered to the placement strategies with a uniform capacity snapshot.
/// `auto`/`spread` degrade to round-robin-by-assignment-count; `manual` and
/// `datacenter` don't consult these numbers at all.
fn placeholder_host_candidates(host_ids: Vec<(String, Option<String>)>) -> Vec<HostCandidate> {
    host_ids
        .into_iter()
        .map(|(host_id, datacenter)| HostCandidate {
            host_id,
            datacenter,
            labels: HashMap::new(),
            cpu_total: 4.0,
            cpu_free: 4.0,
            memory_total_mb: 8192,
            memory_free_mb: 8192,
            container_count: 0,
        })
        .collect()
}

async fn orchestrator(ctx: &AppContext) -> StackOrchestrator {
    let task_queue = Arc::new(TaskQueueService::new(ctx.db.tasks.clone()));
    StackOrchestrator::new(task_queue, ctx.db.stacks.clone(), ctx.db.deployment_states.clone(), HashMap::new())
}

pub async fn handle_deploy(ctx: AppContext, file: std::path::PathBuf, name: Option<String>, datacenter: Option<String>, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let doc: StackGraphDocument = parse_graph_document(&file, &text)?;
    let graph = StackGraph::parse(&doc)?;
    graph.validate_dependencies()?;

    let configs = ctx.db.agent_configs.list(&ListFilter::new()).await?;
    let host_candidates = placeholder_host_candidates(
        configs.into_iter().filter(|c| c.enabled).map(|c| (c.host_id, c.datacenter)).collect(),
    );

    let strategy = if datacenter.is_some() { PlacementStrategy::Datacenter } else { PlacementStrategy::Auto };
    let deployment_config = DeploymentConfig {
        mode: DeploymentMode::MultiHost,
        placement_strategy: strategy,
        network_mode: NetworkMode::Overlay,
        create_network_if_not_exists: true,
    };

    let stack_name = name.unwrap_or_else(|| {
        file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "stack".to_string())
    });
    let mut stack = Stack::new(stack_name, deployment_config, graph.containers.keys().cloned().collect());
    stack.datacenter = datacenter.clone();
    ctx.db.stacks.put(&stack.id, &stack, None).await?;

    let orch = orchestrator(&ctx).await;
    let plan = orch.plan(&stack, &graph, &host_candidates).await?;
    let state = orch.deploy(plan).await?;

    output::emit(
        json,
        &state,
        &["stack_id", "status", "phase", "progress"],
        vec![vec![state.stack_id.clone(), format!("{:?}", state.status), state.phase.clone(), format!("{}%", state.progress)]],
    );
    Ok(())
}

fn parse_graph_document(file: &Path, text: &str) -> Result<StackGraphDocument> {
    match file.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(text).context("failed to parse stack graph as YAML"),
        _ => serde_json::from_str(text).context("failed to parse stack graph as JSON"),
    }
}

pub async fn handle_list(ctx: AppContext, json: bool) -> Result<()> {
    let stacks = ctx.db.stacks.list(&ListFilter::new()).await?;
    let rows = stacks
        .iter()
        .map(|s| vec![s.id.clone(), s.name.clone(), format!("{:?}", s.status), s.containers.len().to_string()])
        .collect();
    output::emit(json, &stacks, &["ID", "NAME", "STATUS", "CONTAINERS"], rows);
    Ok(())
}

pub async fn handle_status(ctx: AppContext, stack_id: String, json: bool) -> Result<()> {
    let state = ctx
        .db
        .deployment_states
        .get(&stack_id)
        .await?
        .context("no deployment state recorded for this stack")?;
    let rows = vec![vec![
        state.stack_id.clone(),
        format!("{:?}", state.status),
        state.phase.clone(),
        format!("{}%", state.progress),
        state.placements.len().to_string(),
    ]];
    output::emit(json, &state, &["STACK", "STATUS", "PHASE", "PROGRESS", "PLACEMENTS"], rows);
    Ok(())
}

pub async fn handle_stop(ctx: AppContext, stack_id: String, json: bool) -> Result<()> {
    let orch = orchestrator(&ctx).await;
    orch.stop(&stack_id).await?;
    output::emit_message(json, &format!("stop tasks issued for stack {stack_id}"));
    Ok(())
}

pub async fn handle_remove(ctx: AppContext, stack_id: String, json: bool) -> Result<()> {
    let orch = orchestrator(&ctx).await;
    orch.remove(&stack_id).await?;
    output::emit_message(json, &format!("remove tasks issued for stack {stack_id}"));
    Ok(())
}
