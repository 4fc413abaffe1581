//! End-to-end stack lifecycle: plan → deploy → multi-wave rollout against a
//! simulated agent, and rollback when a wave fails partway through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use graphium::domain::models::{
    ContainerSpec, DeploymentConfig, DeploymentMode, NetworkMode, PlacementStrategy, PlanHealthcheckSpec, Stack,
    StackStatus, TaskKind, TaskStatus,
};
use graphium::domain::ports::{ListFilter, Store};
use graphium::infrastructure::database::Database;
use graphium::services::orchestrator::{StackGraph, StackOrchestrator};
use graphium::services::task_queue_service::TaskQueueService;

fn container(name: &str, image: &str, depends_on: &[&str], host: &str) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        image: image.to_string(),
        env: HashMap::new(),
        ports: HashMap::new(),
        mounts: Vec::new(),
        healthcheck: None,
        resources: Default::default(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        located_in_host: Some(host.to_string()),
        restart_policy: None,
    }
}

fn graph(containers: Vec<ContainerSpec>) -> StackGraph {
    StackGraph { containers: containers.into_iter().map(|c| (c.name.clone(), c)).collect() }
}

/// A tight polling loop standing in for a real agent: resolves every
/// `deploy` task as `Completed` unless its image matches `fail_image`, and
/// always resolves `delete` tasks so rollback's teardown can reach a
/// terminal state.
async fn simulate_agent(task_queue: Arc<TaskQueueService>, host_id: String, fail_image: Option<String>, rounds: usize) {
    for _ in 0..rounds {
        let pending = task_queue.poll(&host_id, 10).await.unwrap();
        for task in pending {
            task_queue.report_status(&task.id, TaskStatus::Running, None, None).await.unwrap();
            match task.kind {
                TaskKind::Deploy => {
                    let image = task.payload.get("image").and_then(|v| v.as_str()).unwrap_or_default();
                    if Some(image) == fail_image.as_deref() {
                        task_queue
                            .report_status(&task.id, TaskStatus::Failed, Some("image pull failed".to_string()), None)
                            .await
                            .unwrap();
                    } else {
                        let container_id = format!("container-{}", &task.id[..8]);
                        task_queue
                            .report_status(&task.id, TaskStatus::Completed, None, Some(serde_json::json!({"container_id": container_id})))
                            .await
                            .unwrap();
                    }
                }
                TaskKind::Delete | TaskKind::Stop => {
                    task_queue.report_status(&task.id, TaskStatus::Completed, None, Some(serde_json::json!({}))).await.unwrap();
                }
                TaskKind::Check => {
                    let healthy = task.payload.get("container_id").and_then(|v| v.as_str()) != Some("unhealthy-container");
                    task_queue
                        .report_status(&task.id, TaskStatus::Completed, None, Some(serde_json::json!({"healthy": healthy})))
                        .await
                        .unwrap();
                }
                _ => {}
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn deploy_rolls_out_waves_to_running() {
    let db = Database::connect_in_memory().await.unwrap();
    let task_queue = Arc::new(TaskQueueService::new(db.tasks.clone()));
    let orch = StackOrchestrator::new(task_queue.clone(), db.stacks.clone(), db.deployment_states.clone(), HashMap::new());

    let g = graph(vec![
        container("db", "postgres:16", &[], "host-a"),
        container("api", "app:latest", &["db"], "host-a"),
    ]);

    let deployment_config = DeploymentConfig {
        mode: DeploymentMode::MultiHost,
        placement_strategy: PlacementStrategy::Manual,
        network_mode: NetworkMode::HostPort,
        create_network_if_not_exists: false,
    };
    let stack = Stack::new("demo", deployment_config, vec!["db".to_string(), "api".to_string()]);
    db.stacks.put(&stack.id, &stack, None).await.unwrap();

    let plan = orch.plan(&stack, &g, &[]).await.unwrap();
    assert_eq!(plan.waves.len(), 2, "db must land in an earlier wave than api");

    let agent = tokio::spawn(simulate_agent(task_queue.clone(), "host-a".to_string(), None, 50));
    let state = orch.deploy(plan).await.unwrap();
    agent.abort();

    assert_eq!(state.status, StackStatus::Running);
    assert_eq!(state.placements.len(), 2);
    assert!(state.placements.contains_key("db"));
    assert!(state.placements.contains_key("api"));

    let stored = db.stacks.get(&stack.id).await.unwrap().unwrap();
    assert_eq!(stored.status, StackStatus::Running);
    assert!(stored.deployed_at.is_some());
}

#[tokio::test]
async fn a_failed_wave_triggers_rollback_of_earlier_waves() {
    let db = Database::connect_in_memory().await.unwrap();
    let task_queue = Arc::new(TaskQueueService::new(db.tasks.clone()));
    let orch = StackOrchestrator::new(task_queue.clone(), db.stacks.clone(), db.deployment_states.clone(), HashMap::new());

    let g = graph(vec![
        container("db", "postgres:16", &[], "host-a"),
        container("api", "bad-image:latest", &["db"], "host-a"),
    ]);

    let deployment_config = DeploymentConfig {
        mode: DeploymentMode::MultiHost,
        placement_strategy: PlacementStrategy::Manual,
        network_mode: NetworkMode::HostPort,
        create_network_if_not_exists: false,
    };
    let stack = Stack::new("demo", deployment_config, vec!["db".to_string(), "api".to_string()]);
    db.stacks.put(&stack.id, &stack, None).await.unwrap();

    let plan = orch.plan(&stack, &g, &[]).await.unwrap();

    let agent = tokio::spawn(simulate_agent(
        task_queue.clone(),
        "host-a".to_string(),
        Some("bad-image:latest".to_string()),
        80,
    ));
    let state = orch.deploy(plan).await.unwrap();
    agent.abort();

    assert_eq!(state.status, StackStatus::RolledBack);
    let rollback = state.rollback_state.expect("rollback_state should be recorded");
    assert_eq!(rollback.removed_containers, vec!["db".to_string()]);
    assert!(rollback.failure_message.is_none());

    let deploy_tasks = task_queue.list(&ListFilter::new().with_equals("host_id", "host-a")).await.unwrap();
    let delete_count = deploy_tasks.iter().filter(|t| t.kind == TaskKind::Delete).count();
    assert_eq!(delete_count, 1, "only the successfully-placed db container should be torn down");
}

#[tokio::test]
async fn wave_completion_waits_for_a_defined_healthcheck() {
    let db = Database::connect_in_memory().await.unwrap();
    let task_queue = Arc::new(TaskQueueService::new(db.tasks.clone()));
    let orch = StackOrchestrator::new(task_queue.clone(), db.stacks.clone(), db.deployment_states.clone(), HashMap::new());

    let mut db_container = container("db", "postgres:16", &[], "host-a");
    db_container.healthcheck = Some(PlanHealthcheckSpec {
        test: vec!["CMD".to_string(), "pg_isready".to_string()],
        interval_seconds: Some(1),
        timeout_seconds: Some(1),
        retries: Some(2),
    });
    let g = graph(vec![db_container]);

    let deployment_config = DeploymentConfig {
        mode: DeploymentMode::MultiHost,
        placement_strategy: PlacementStrategy::Manual,
        network_mode: NetworkMode::HostPort,
        create_network_if_not_exists: false,
    };
    let stack = Stack::new("demo", deployment_config, vec!["db".to_string()]);
    db.stacks.put(&stack.id, &stack, None).await.unwrap();

    let plan = orch.plan(&stack, &g, &[]).await.unwrap();

    let agent = tokio::spawn(simulate_agent(task_queue.clone(), "host-a".to_string(), None, 50));
    let state = orch.deploy(plan).await.unwrap();
    agent.abort();

    assert_eq!(state.status, StackStatus::Running);
    assert!(state.placements.contains_key("db"));

    let check_tasks: Vec<_> = task_queue
        .list(&ListFilter::new().with_equals("host_id", "host-a"))
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TaskKind::Check)
        .collect();
    assert_eq!(check_tasks.len(), 1, "the wave must submit exactly one healthcheck per container");
    assert_eq!(check_tasks[0].status, TaskStatus::Completed);
}
