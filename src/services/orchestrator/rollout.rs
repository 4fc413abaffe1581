//! Multi-host rollout driver: emits `deploy` tasks wave-by-wave, waits for
//! each wave to complete, and triggers rollback on any container failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{
    DeploymentEvent, DeploymentEventKind, DeploymentPlan, DeploymentState, Placement, PlacementStatus,
    PlanHealthcheckSpec, StackStatus, Task, TaskKind, TaskStatus,
};
use crate::domain::ports::{ListFilter, Store};
use crate::services::task_queue_service::TaskQueueService;

use super::rollback::rollback_stack;

const WAVE_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Upper bound on how long a wave waits for one container's healthcheck to
/// pass, independent of the healthcheck's own interval/retries budget.
const WAVE_HEALTHCHECK_DEADLINE: Duration = Duration::from_secs(120);

pub struct Rollout {
    pub task_queue: Arc<TaskQueueService>,
    pub deployment_store: Arc<dyn Store<DeploymentState>>,
}

impl Rollout {
    /// Drive the full rollout described by `plan`, mutating and persisting
    /// `DeploymentState` as each wave progresses.
    #[instrument(skip(self, plan, state), fields(stack_id = %plan.stack_id))]
    pub async fn run(&self, plan: &DeploymentPlan, mut state: DeploymentState) -> GraphiumResult<DeploymentState> {
        state.status = StackStatus::Deploying;
        self.persist(&mut state).await?;

        for (wave_index, wave) in plan.waves.iter().enumerate() {
            state.push_event(DeploymentEvent::new(
                DeploymentEventKind::WaveStarted,
                format!("wave {wave_index} starting with {} containers", wave.len()),
            ));
            self.persist(&mut state).await?;

            let mut task_ids = Vec::new();
            for name in wave {
                let spec = plan
                    .container_specs
                    .get(name)
                    .ok_or_else(|| GraphiumError::Validation(format!("missing spec for {name}")))?;
                let host_id = plan
                    .host_map
                    .get(name)
                    .ok_or_else(|| GraphiumError::PlacementUnsatisfiable(format!("no placement for {name}")))?;

                let payload = serde_json::json!({
                    "image": spec.image,
                    "pull_policy": "if-not-present",
                    "env": spec.env,
                    "ports": spec.ports,
                    "mounts": spec.mounts,
                    "resources": spec.resources,
                    "restart_policy": spec.restart_policy,
                    "healthcheck": spec.healthcheck,
                });
                let mut task = Task::new(TaskKind::Deploy, host_id.clone(), payload);
                task.stack_id = Some(plan.stack_id.clone());
                let submitted = self.task_queue.submit(task).await?;
                task_ids.push((name.clone(), submitted.id));
            }

            let outcomes = self.await_wave(&task_ids).await?;

            let mut wave_failed = false;
            for (name, outcome) in outcomes {
                let host_id = plan.host_map[&name].clone();
                let outcome = match outcome {
                    Ok(container_id) => match plan.container_specs.get(&name).and_then(|s| s.healthcheck.as_ref()) {
                        Some(hc) if !hc.test.is_empty() => {
                            self.await_healthcheck(&host_id, &container_id, hc).await?.map(|()| container_id)
                        }
                        _ => Ok(container_id),
                    },
                    Err(message) => Err(message),
                };

                match outcome {
                    Ok(container_id) => {
                        state.placements.insert(
                            name.clone(),
                            Placement {
                                container_id,
                                host_id,
                                ip: None,
                                ports: HashMap::new(),
                                status: PlacementStatus::Running,
                                started_at: Some(chrono::Utc::now()),
                            },
                        );
                    }
                    Err(message) => {
                        wave_failed = true;
                        state.push_event(
                            DeploymentEvent::new(DeploymentEventKind::ContainerFailed, message).with_container(name),
                        );
                    }
                }
            }

            state.push_event(DeploymentEvent::new(
                DeploymentEventKind::WaveCompleted,
                format!("wave {wave_index} completed"),
            ));
            state.progress = (((wave_index + 1) as f64 / plan.waves.len().max(1) as f64) * 100.0) as u8;
            self.persist(&mut state).await?;

            if wave_failed {
                warn!(stack_id = %plan.stack_id, wave = wave_index, "wave failed, rolling back");
                return rollback_stack(&self.task_queue, &self.deployment_store, plan, state).await;
            }
        }

        state.status = StackStatus::Running;
        state.completed_at = Some(chrono::Utc::now());
        self.persist(&mut state).await?;
        info!(stack_id = %plan.stack_id, "stack rollout complete");
        Ok(state)
    }

    /// Poll task statuses until every task in the wave reaches a terminal
    /// state, returning each container's resulting id or failure message.
    async fn await_wave(&self, task_ids: &[(String, String)]) -> GraphiumResult<Vec<(String, Result<String, String>)>> {
        let mut outcomes = HashMap::new();
        loop {
            for (name, task_id) in task_ids {
                if outcomes.contains_key(name) {
                    continue;
                }
                let Some(task) = self.task_queue.get(task_id).await? else {
                    continue;
                };
                match task.status {
                    TaskStatus::Completed => {
                        let container_id = task
                            .result
                            .as_ref()
                            .and_then(|r| r.get("container_id"))
                            .and_then(|v| v.as_str())
                            .unwrap_or(task_id)
                            .to_string();
                        outcomes.insert(name.clone(), Ok(container_id));
                    }
                    TaskStatus::Failed | TaskStatus::Cancelled => {
                        outcomes.insert(
                            name.clone(),
                            Err(task.error.unwrap_or_else(|| "task failed".to_string())),
                        );
                    }
                    _ => {}
                }
            }

            if outcomes.len() == task_ids.len() {
                break;
            }
            tokio::time::sleep(WAVE_POLL_INTERVAL).await;
        }

        Ok(task_ids
            .iter()
            .map(|(name, _)| (name.clone(), outcomes.remove(name).expect("populated above")))
            .collect())
    }

    /// Submit a `container-health` check for `container_id` on `host_id` and
    /// wait for it to report healthy, up to `WAVE_HEALTHCHECK_DEADLINE`. The
    /// check task itself retries on `hc`'s own interval/retries budget; this
    /// deadline bounds only how long the wave waits on top of that.
    async fn await_healthcheck(&self, host_id: &str, container_id: &str, hc: &PlanHealthcheckSpec) -> GraphiumResult<Result<(), String>> {
        let payload = serde_json::json!({
            "check_type": "container-health",
            "container_id": container_id,
            "command": hc.test,
            "interval_seconds": hc.interval_seconds,
            "timeout_seconds": hc.timeout_seconds,
            "retries": hc.retries,
        });
        let task = Task::new(TaskKind::Check, host_id.to_string(), payload);
        let submitted = self.task_queue.submit(task).await?;

        let deadline = tokio::time::Instant::now() + WAVE_HEALTHCHECK_DEADLINE;
        loop {
            if let Some(task) = self.task_queue.get(&submitted.id).await? {
                match task.status {
                    TaskStatus::Completed => {
                        let healthy = task.result.as_ref().and_then(|r| r.get("healthy")).and_then(|v| v.as_bool()).unwrap_or(false);
                        return Ok(if healthy {
                            Ok(())
                        } else {
                            Err(format!("container {container_id} failed its healthcheck"))
                        });
                    }
                    TaskStatus::Failed | TaskStatus::Cancelled => {
                        return Ok(Err(task.error.unwrap_or_else(|| format!("container {container_id} healthcheck task failed"))));
                    }
                    _ => {}
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Err(format!("container {container_id} did not pass its healthcheck within the wave deadline")));
            }
            tokio::time::sleep(WAVE_POLL_INTERVAL).await;
        }
    }

    async fn persist(&self, state: &mut DeploymentState) -> GraphiumResult<()> {
        let expected = if self.deployment_store.get(&state.stack_id).await?.is_some() {
            Some(state.revision)
        } else {
            None
        };
        let new_rev = self.deployment_store.put(&state.stack_id, state, expected).await?;
        state.revision = new_rev;
        Ok(())
    }
}

/// Fetch deployment states by an equality filter; thin convenience wrapper
/// shared by CLI query commands.
pub async fn list_deployments(
    store: &dyn Store<DeploymentState>,
    filter: &ListFilter,
) -> GraphiumResult<Vec<DeploymentState>> {
    store.list(filter).await
}
