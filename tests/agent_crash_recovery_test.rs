//! Agent crash mid-task: a task stuck in `running` past its timeout is
//! reaped back to `pending` and a live poll loop picks it up and finishes it.

use std::sync::Arc;
use std::time::Duration;

use graphium::adapters::memory::FakeRuntime;
use graphium::domain::models::{Task, TaskKind, TaskStatus};
use graphium::infrastructure::database::Database;
use graphium::services::agent_runtime::poll_loop::TaskSource;
use graphium::services::agent_runtime::{AgentPollLoop, AgentStats, HandlerContext};
use graphium::services::task_queue_service::TaskQueueService;

#[tokio::test]
async fn a_stalled_task_is_reaped_and_completed_by_a_fresh_poll_loop() {
    let db = Database::connect_in_memory().await.unwrap();
    let task_queue = Arc::new(TaskQueueService::new(db.tasks.clone()));

    let mut task = Task::new(
        TaskKind::Deploy,
        "host-a",
        serde_json::json!({"image": "alpine:latest", "pull_policy": "if-not-present"}),
    );
    task.timeout_seconds = 1;
    task.max_retries = 2;
    task_queue.submit(task.clone()).await.unwrap();

    // The agent picked it up and reported `running`, then the process died
    // before ever reporting a terminal status.
    task_queue.report_status(&task.id, TaskStatus::Running, None, None).await.unwrap();
    let mut stalled = task_queue.get(&task.id).await.unwrap().unwrap();
    stalled.started_at = Some(chrono::Utc::now() - chrono::Duration::seconds(30));
    db.tasks.put(&stalled.id, &stalled, Some(stalled.revision)).await.unwrap();

    let reaped = task_queue.reap_expired().await.unwrap();
    assert_eq!(reaped, 1);
    let recovered = task_queue.get(&task.id).await.unwrap().unwrap();
    assert_eq!(recovered.status, TaskStatus::Pending, "reap_expired should make the task pollable again");
    assert_eq!(recovered.retry_count, 1);

    let handler_ctx = HandlerContext { runtime: Arc::new(FakeRuntime::new()), log_collection_dir: std::env::temp_dir() };
    let task_source: Arc<dyn TaskSource> = task_queue.clone();
    let poll_loop = Arc::new(AgentPollLoop {
        host_id: "host-a".to_string(),
        poll_interval: Duration::from_millis(20),
        task_queue: task_source,
        handler_ctx,
        stats: Arc::new(AgentStats::new()),
    });

    let (_tx, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn({
        let poll_loop = poll_loop.clone();
        async move { poll_loop.run(rx).await }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.abort();

    let finished = task_queue.get(&task.id).await.unwrap().unwrap();
    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(poll_loop.stats.sync_count.load(std::sync::atomic::Ordering::Relaxed) > 0);
}
