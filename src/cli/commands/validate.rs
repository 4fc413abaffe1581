//! `graphium validate <kind> <file>`: run the same validation the live
//! deploy/submit paths apply, without persisting or submitting anything.

use anyhow::{bail, Context, Result};

use crate::domain::models::Task;
use crate::services::orchestrator::{StackGraph, StackGraphDocument};

pub async fn handle(kind: String, file: std::path::PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let is_yaml = matches!(file.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));

    match kind.as_str() {
        "stack" => {
            let doc: StackGraphDocument = if is_yaml {
                serde_yaml::from_str(&text).context("invalid stack graph YAML")?
            } else {
                serde_json::from_str(&text).context("invalid stack graph JSON")?
            };
            let graph = StackGraph::parse(&doc)?;
            graph.validate_dependencies()?;
            let waves = graph.compute_waves()?;
            println!("stack graph valid: {} container(s), {} wave(s)", graph.containers.len(), waves.len());
        }
        "task" => {
            let mut task: Task = if is_yaml {
                serde_yaml::from_str(&text).context("invalid task payload YAML")?
            } else {
                serde_json::from_str(&text).context("invalid task payload JSON")?
            };
            task.normalize();
            if task.host_id.trim().is_empty() {
                bail!("task host_id must not be empty");
            }
            println!("task payload valid: kind={:?} host_id={}", task.kind, task.host_id);
        }
        other => bail!("unknown validate kind '{other}', expected 'stack' or 'task'"),
    }
    Ok(())
}
