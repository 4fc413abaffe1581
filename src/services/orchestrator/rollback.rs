//! Stack rollback: tear down successfully-placed containers in reverse
//! wave order after a failed rollout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{
    DeploymentEvent, DeploymentEventKind, DeploymentPlan, DeploymentState, RollbackState, StackStatus, Task, TaskKind,
    TaskStatus,
};
use crate::domain::ports::Store;
use crate::services::task_queue_service::TaskQueueService;

const REMOVE_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn rollback_stack(
    task_queue: &Arc<TaskQueueService>,
    deployment_store: &Arc<dyn Store<DeploymentState>>,
    plan: &DeploymentPlan,
    mut state: DeploymentState,
) -> GraphiumResult<DeploymentState> {
    state.status = StackStatus::RollingBack;
    state.push_event(DeploymentEvent::new(DeploymentEventKind::RollbackStarted, "rolling back failed deployment"));
    persist(deployment_store, &mut state).await?;

    let mut removed = Vec::new();
    let mut failure_message = None;

    // Reverse wave order: last successfully-deployed wave is torn down first.
    for wave in plan.waves.iter().rev() {
        for name in wave {
            let Some(placement) = state.placements.get(name) else {
                continue;
            };
            let task = Task::new(
                TaskKind::Delete,
                placement.host_id.clone(),
                serde_json::json!({
                    "container_id": placement.container_id,
                    "remove_volumes": false,
                    "force": true,
                }),
            );
            let submitted = match task_queue.submit(task).await {
                Ok(t) => t,
                Err(e) => {
                    failure_message = Some(e.to_string());
                    continue;
                }
            };

            match await_terminal(task_queue, &submitted.id).await {
                Ok(true) => removed.push(name.clone()),
                Ok(false) => failure_message = Some(format!("failed to remove container for {name}")),
                Err(e) => failure_message = Some(e.to_string()),
            }
        }
    }

    state.rollback_state = Some(RollbackState {
        removed_containers: removed,
        failure_message: failure_message.clone(),
    });

    if let Some(message) = failure_message {
        warn!(stack_id = %plan.stack_id, %message, "rollback incomplete");
        state.status = StackStatus::Error;
        state.push_event(DeploymentEvent::new(DeploymentEventKind::RollbackFailed, message));
    } else {
        info!(stack_id = %plan.stack_id, "rollback complete");
        state.status = StackStatus::RolledBack;
        state.push_event(DeploymentEvent::new(DeploymentEventKind::RollbackCompleted, "rollback complete"));
    }
    state.completed_at = Some(chrono::Utc::now());
    persist(deployment_store, &mut state).await?;

    Ok(state)
}

async fn await_terminal(task_queue: &Arc<TaskQueueService>, task_id: &str) -> GraphiumResult<bool> {
    loop {
        let Some(task) = task_queue.get(task_id).await? else {
            return Ok(false);
        };
        match task.status {
            TaskStatus::Completed => return Ok(true),
            TaskStatus::Failed | TaskStatus::Cancelled => return Ok(false),
            _ => tokio::time::sleep(REMOVE_POLL_INTERVAL).await,
        }
    }
}

async fn persist(store: &Arc<dyn Store<DeploymentState>>, state: &mut DeploymentState) -> GraphiumResult<()> {
    let expected = if store.get(&state.stack_id).await?.is_some() {
        Some(state.revision)
    } else {
        None
    };
    let new_rev = store.put(&state.stack_id, state, expected).await?;
    state.revision = new_rev;
    Ok(())
}
