//! `graphium query`: read-only views over persisted tasks and stacks. The
//! dependency-graph operations reuse the same Kahn-layering approach as
//! `StackOrchestrator`'s wave computation, applied to the task graph a
//! stack's submitted tasks form via `Task::depends_on`.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{bail, Context, Result};

use crate::cli::commands::context::AppContext;
use crate::cli::output;
use crate::domain::errors::GraphiumError;
use crate::domain::models::Task;
use crate::domain::ports::{ListFilter, Store};

pub async fn handle_list(ctx: AppContext, entity: String, host_id: Option<String>, status: Option<String>, json: bool) -> Result<()> {
    match entity.as_str() {
        "tasks" => {
            let mut filter = ListFilter::new();
            if let Some(h) = &host_id {
                filter = filter.with_equals("host_id", h);
            }
            if let Some(s) = &status {
                filter = filter.with_equals("status", s);
            }
            let tasks = ctx.db.tasks.list(&filter).await?;
            let rows = tasks
                .iter()
                .map(|t| vec![t.id.clone(), t.kind.as_str().to_string(), t.status.as_str().to_string(), t.host_id.clone(), t.priority.to_string()])
                .collect();
            output::emit(json, &tasks, &["ID", "KIND", "STATUS", "HOST", "PRIORITY"], rows);
        }
        "stacks" => {
            let stacks = ctx.db.stacks.list(&ListFilter::new()).await?;
            let rows = stacks
                .iter()
                .map(|s| vec![s.id.clone(), s.name.clone(), format!("{:?}", s.status)])
                .collect();
            output::emit(json, &stacks, &["ID", "NAME", "STATUS"], rows);
        }
        other => bail!("unknown entity '{other}', expected 'tasks' or 'stacks'"),
    }
    Ok(())
}

async fn stack_tasks(ctx: &AppContext, stack_id: &str) -> Result<HashMap<String, Task>> {
    let tasks = ctx.db.tasks.list(&ListFilter::new().with_equals("stack_id", stack_id)).await?;
    Ok(tasks.into_iter().map(|t| (t.id.clone(), t)).collect())
}

pub async fn handle_traverse(ctx: AppContext, stack_id: String, node: String, json: bool) -> Result<()> {
    let tasks = stack_tasks(&ctx, &stack_id).await?;
    if !tasks.contains_key(&node) {
        return Err(GraphiumError::TaskNotFound(node).into());
    }

    // Transitive closure over `depends_on`, i.e. everything `node` needs
    // to complete first.
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([node.clone()]);
    let mut order = Vec::new();
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(task) = tasks.get(&current) {
            for dep in &task.depends_on {
                queue.push_back(dep.clone());
            }
        }
        order.push(current);
    }
    order.retain(|id| *id != node);

    let rows = order.iter().filter_map(|id| tasks.get(id)).map(|t| vec![t.id.clone(), t.kind.as_str().to_string(), t.status.as_str().to_string()]).collect();
    output::emit(json, &order, &["ID", "KIND", "STATUS"], rows);
    Ok(())
}

pub async fn handle_dependents(ctx: AppContext, stack_id: String, node: String, json: bool) -> Result<()> {
    let tasks = stack_tasks(&ctx, &stack_id).await?;
    if !tasks.contains_key(&node) {
        return Err(GraphiumError::TaskNotFound(node).into());
    }

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in tasks.values() {
        for dep in &task.depends_on {
            dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([node.as_str()]);
    let mut order = Vec::new();
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(children) = dependents.get(current) {
            for child in children {
                queue.push_back(child);
            }
        }
        if current != node {
            order.push(current.to_string());
        }
    }

    let rows = order.iter().filter_map(|id| tasks.get(id)).map(|t| vec![t.id.clone(), t.kind.as_str().to_string(), t.status.as_str().to_string()]).collect();
    output::emit(json, &order, &["ID", "KIND", "STATUS"], rows);
    Ok(())
}

/// Kahn's-algorithm layering over the task graph, mirroring
/// `StackGraph::compute_waves`'s approach but keyed by task id instead of
/// container name.
fn compute_task_waves(tasks: &HashMap<String, Task>) -> Result<Vec<Vec<String>>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in tasks.values() {
        in_degree.entry(task.id.as_str()).or_insert(0);
        for dep in &task.depends_on {
            *in_degree.entry(task.id.as_str()).or_insert(0) += 1;
            dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut waves = Vec::new();
    let mut remaining: HashSet<&str> = in_degree.keys().copied().collect();
    let mut frontier: VecDeque<&str> = in_degree.iter().filter(|(_, deg)| **deg == 0).map(|(id, _)| *id).collect();

    while !frontier.is_empty() {
        let wave: Vec<String> = frontier.iter().map(|s| s.to_string()).collect();
        let mut next_frontier = VecDeque::new();
        for id in frontier.drain(..) {
            remaining.remove(id);
            if let Some(children) = dependents.get(id) {
                for child in children {
                    if let Some(deg) = in_degree.get_mut(child) {
                        *deg -= 1;
                        if *deg == 0 {
                            next_frontier.push_back(*child);
                        }
                    }
                }
            }
        }
        waves.push(wave);
        frontier = next_frontier;
    }

    if !remaining.is_empty() {
        bail!("task dependency cycle detected among: {:?}", remaining);
    }
    Ok(waves)
}

pub async fn handle_topology(ctx: AppContext, stack_id: String, json: bool) -> Result<()> {
    let tasks = stack_tasks(&ctx, &stack_id).await.context("failed to load stack tasks")?;
    let waves = compute_task_waves(&tasks)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&waves)?);
        return Ok(());
    }
    for (index, wave) in waves.iter().enumerate() {
        println!("wave {index}: {}", wave.join(", "));
    }
    Ok(())
}

pub async fn handle_stats(ctx: AppContext, json: bool) -> Result<()> {
    let tasks = ctx.db.tasks.list(&ListFilter::new()).await?;
    let mut by_status: HashMap<&str, usize> = HashMap::new();
    for task in &tasks {
        *by_status.entry(task.status.as_str()).or_insert(0) += 1;
    }
    let rows = by_status.iter().map(|(status, count)| vec![status.to_string(), count.to_string()]).collect();
    output::emit(json, &by_status, &["STATUS", "COUNT"], rows);
    Ok(())
}
