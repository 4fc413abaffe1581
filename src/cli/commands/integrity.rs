//! `graphium integrity`: fleet-wide liveness and orphan-placement checks.
//! `scan`/`plan` share one pass over deployment state; `repair` issues the
//! corrective tasks `scan` would recommend.

use chrono::Utc;

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::context::AppContext;
use crate::cli::output;
use crate::domain::models::{Task, TaskKind};
use crate::domain::ports::{ListFilter, Store};

#[derive(Debug, Serialize)]
struct AgentHealth {
    host_id: String,
    enabled: bool,
    status: &'static str,
}

pub async fn handle_health(ctx: AppContext, json: bool) -> Result<()> {
    let configs = ctx.db.agent_configs.list(&ListFilter::new()).await?;
    let mut rows = Vec::new();
    let mut report = Vec::new();
    for config in configs {
        let agent = ctx.db.agents.get(&config.host_id).await?;
        let status = match &agent {
            None => "unknown",
            Some(agent) => match agent.last_seen_at {
                Some(last_seen) => {
                    let threshold = chrono::Duration::seconds((config.sync_interval_seconds * 3) as i64);
                    if Utc::now() - last_seen < threshold {
                        "healthy"
                    } else {
                        "stale"
                    }
                }
                None => "unknown",
            },
        };
        rows.push(vec![config.host_id.clone(), config.enabled.to_string(), status.to_string()]);
        report.push(AgentHealth { host_id: config.host_id, enabled: config.enabled, status });
    }
    output::emit(json, &report, &["HOST", "ENABLED", "STATUS"], rows);
    Ok(())
}

/// An orphan: a `Running`/`Deploying` placement on a host with no enabled
/// `AgentConfig` left to reconcile it.
#[derive(Debug, Serialize, Clone)]
struct Orphan {
    stack_id: String,
    container_id: String,
    host_id: String,
}

async fn find_orphans(ctx: &AppContext) -> Result<Vec<Orphan>> {
    let configs = ctx.db.agent_configs.list(&ListFilter::new()).await?;
    let live_hosts: std::collections::HashSet<String> =
        configs.into_iter().filter(|c| c.enabled).map(|c| c.host_id).collect();

    let states = ctx.db.deployment_states.list(&ListFilter::new()).await?;
    let mut orphans = Vec::new();
    for state in states {
        for placement in state.placements.values() {
            if !live_hosts.contains(&placement.host_id) {
                orphans.push(Orphan {
                    stack_id: state.stack_id.clone(),
                    container_id: placement.container_id.clone(),
                    host_id: placement.host_id.clone(),
                });
            }
        }
    }
    Ok(orphans)
}

async fn active_ignore_entries(ctx: &AppContext) -> Result<std::collections::HashSet<String>> {
    let entries = ctx.db.ignore_entries.list(&ListFilter::new()).await?;
    let now = Utc::now();
    Ok(entries
        .into_iter()
        .filter(|e| e.is_active(now))
        .map(|e| crate::adapters::sqlite::ignore_entry_id(&e.container_id, &e.host_id))
        .collect())
}

pub async fn handle_scan(ctx: AppContext, json: bool) -> Result<()> {
    let orphans = find_orphans(&ctx).await?;
    let rows = orphans.iter().map(|o| vec![o.stack_id.clone(), o.container_id.clone(), o.host_id.clone()]).collect();
    output::emit(json, &orphans, &["STACK", "CONTAINER", "HOST"], rows);
    Ok(())
}

pub async fn handle_plan(ctx: AppContext, json: bool) -> Result<()> {
    let orphans = find_orphans(&ctx).await?;
    let ignored = active_ignore_entries(&ctx).await?;
    let actionable: Vec<&Orphan> = orphans
        .iter()
        .filter(|o| !ignored.contains(&crate::adapters::sqlite::ignore_entry_id(&o.container_id, &o.host_id)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&actionable)?);
        return Ok(());
    }
    if actionable.is_empty() {
        println!("no corrective action needed");
        return Ok(());
    }
    for orphan in actionable {
        println!("would delete {} on {} (stack {})", orphan.container_id, orphan.host_id, orphan.stack_id);
    }
    Ok(())
}

pub async fn handle_repair(ctx: AppContext, json: bool) -> Result<()> {
    let orphans = find_orphans(&ctx).await?;
    let ignored = active_ignore_entries(&ctx).await?;

    let mut issued = Vec::new();
    for orphan in orphans {
        if ignored.contains(&crate::adapters::sqlite::ignore_entry_id(&orphan.container_id, &orphan.host_id)) {
            continue;
        }
        let payload = serde_json::json!({ "container_id": orphan.container_id });
        let mut task = Task::new(TaskKind::Delete, orphan.host_id.clone(), payload);
        task.stack_id = Some(orphan.stack_id.clone());
        ctx.db.tasks.put(&task.id, &task, None).await?;
        issued.push(task.id);
    }

    output::emit_message(json, &format!("issued {} corrective delete task(s)", issued.len()));
    Ok(())
}
