//! Distributed Stack Orchestrator (§4.4): parses a stack graph, plans
//! placements, computes dependency waves, and drives a multi-host rollout
//! with rollback on failure.

pub mod placement;
pub mod rollback;
pub mod rollout;
pub mod stack_graph;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{
    DeploymentPlan, DeploymentState, HostCandidate, NetworkMode, NetworkSpec, Stack, StackStatus,
};
use crate::domain::ports::{Runtime, Store};
use crate::services::task_queue_service::TaskQueueService;

pub use placement::plan_placements;
pub use stack_graph::{StackGraph, StackGraphDocument};

use rollout::Rollout;

pub struct StackOrchestrator {
    task_queue: Arc<TaskQueueService>,
    stack_store: Arc<dyn Store<Stack>>,
    deployment_store: Arc<dyn Store<DeploymentState>>,
    runtimes: HashMap<String, Arc<dyn Runtime>>,
}

impl StackOrchestrator {
    pub fn new(
        task_queue: Arc<TaskQueueService>,
        stack_store: Arc<dyn Store<Stack>>,
        deployment_store: Arc<dyn Store<DeploymentState>>,
        runtimes: HashMap<String, Arc<dyn Runtime>>,
    ) -> Self {
        Self {
            task_queue,
            stack_store,
            deployment_store,
            runtimes,
        }
    }

    /// Build a `DeploymentPlan` from a parsed graph: resolve placements,
    /// compute waves, and assign a network spec.
    #[instrument(skip(self, graph, hosts))]
    pub async fn plan(&self, stack: &Stack, graph: &StackGraph, hosts: &[HostCandidate]) -> GraphiumResult<DeploymentPlan> {
        let host_map = plan_placements(
            &graph.containers,
            hosts,
            stack.deployment_config.placement_strategy,
            stack.datacenter.as_deref(),
        )?;
        let waves = graph.compute_waves()?;

        let network_hosts: Vec<String> = {
            let mut set: Vec<String> = host_map.values().cloned().collect();
            set.sort();
            set.dedup();
            set
        };

        Ok(DeploymentPlan {
            stack_id: stack.id.clone(),
            container_specs: graph.containers.clone(),
            host_map,
            network_spec: NetworkSpec {
                name: format!("graphium-{}", stack.name),
                mode: stack.deployment_config.network_mode,
                hosts: network_hosts,
            },
            waves,
        })
    }

    /// Create the stack's network on every participating host, then drive
    /// the wave-by-wave rollout.
    #[instrument(skip(self, plan))]
    pub async fn deploy(&self, plan: DeploymentPlan) -> GraphiumResult<DeploymentState> {
        if let Some(stack) = self.stack_store.get(&plan.stack_id).await? {
            if stack.deployment_config.create_network_if_not_exists {
                let overlay = matches!(plan.network_spec.mode, NetworkMode::Overlay);
                for host_id in &plan.network_spec.hosts {
                    if let Some(runtime) = self.runtimes.get(host_id) {
                        runtime.ensure_network(&plan.network_spec.name, overlay).await?;
                    }
                }
            }
        }

        let state = DeploymentState::new(plan.stack_id.clone());
        let rollout = Rollout {
            task_queue: self.task_queue.clone(),
            deployment_store: self.deployment_store.clone(),
        };
        let final_state = rollout.run(&plan, state).await?;

        if let Some(mut stack) = self.stack_store.get(&plan.stack_id).await? {
            let revision = stack.revision;
            stack.status = final_state.status;
            if final_state.status == StackStatus::Running {
                stack.deployed_at = final_state.completed_at;
            }
            stack.updated_at = chrono::Utc::now();
            self.stack_store.put(&stack.id, &stack, Some(revision)).await?;
        }

        Ok(final_state)
    }

    /// Stop a deployed stack: issue `stop` tasks to the original host of
    /// each placement.
    #[instrument(skip(self))]
    pub async fn stop(&self, stack_id: &str) -> GraphiumResult<()> {
        self.issue_lifecycle_tasks(stack_id, crate::domain::models::TaskKind::Stop).await
    }

    /// Remove a deployed stack: issue `delete` tasks to the original host
    /// of each placement.
    #[instrument(skip(self))]
    pub async fn remove(&self, stack_id: &str) -> GraphiumResult<()> {
        self.issue_lifecycle_tasks(stack_id, crate::domain::models::TaskKind::Delete).await
    }

    async fn issue_lifecycle_tasks(&self, stack_id: &str, kind: crate::domain::models::TaskKind) -> GraphiumResult<()> {
        let Some(deployment) = self.deployment_store.get(stack_id).await? else {
            return Err(crate::domain::errors::GraphiumError::StackNotFound(stack_id.to_string()));
        };
        for placement in deployment.placements.values() {
            let payload = serde_json::json!({ "container_id": placement.container_id });
            let mut task = crate::domain::models::Task::new(kind, placement.host_id.clone(), payload);
            task.stack_id = Some(stack_id.to_string());
            self.task_queue.submit(task).await?;
        }
        Ok(())
    }
}
