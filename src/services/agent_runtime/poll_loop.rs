//! Agent poll loop: every `poll_interval`, fetch pending tasks for this
//! host, post `running`, dispatch by kind, then post the terminal status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{CompositeAction, Task, TaskKind, TaskStatus};
use crate::services::agent_runtime::handlers::{self, HandlerContext};
use crate::services::task_queue_service::TaskQueueService;
use crate::services::workflow::WorkflowExecutor;

/// Where the poll loop pulls tasks from and reports status to. A server
/// running the agent in-process can satisfy this directly from the
/// `TaskQueueService`'s store; a standalone agent process satisfies it over
/// HTTP via `AgentClient`, against the same server API both speak.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn poll(&self, host_id: &str, limit: usize) -> GraphiumResult<Vec<Task>>;

    async fn report_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> GraphiumResult<Task>;
}

#[async_trait]
impl TaskSource for TaskQueueService {
    async fn poll(&self, host_id: &str, limit: usize) -> GraphiumResult<Vec<Task>> {
        self.poll(host_id, limit).await
    }

    async fn report_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> GraphiumResult<Task> {
        self.report_status(task_id, status, error, result).await
    }
}

const POLL_LIMIT: usize = 10;

/// Counters backing the sidecar `/health` response. Cheap enough to update
/// on every tick without contending with the task dispatch path.
#[derive(Default)]
pub struct AgentStats {
    pub sync_count: AtomicU64,
    pub failed_syncs: AtomicU64,
    pub events_count: AtomicU64,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    last_sync_duration_ms: AtomicU64,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl AgentStats {
    pub fn new() -> Self {
        let stats = Self::default();
        *stats.started_at.lock().unwrap() = Some(Utc::now());
        stats
    }

    fn record_sync(&self, duration: Duration, task_count: usize, failed: bool) {
        self.sync_count.fetch_add(1, Ordering::Relaxed);
        self.events_count.fetch_add(task_count as u64, Ordering::Relaxed);
        if failed {
            self.failed_syncs.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_sync.lock().unwrap() = Some(Utc::now());
        self.last_sync_duration_ms.store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> i64 {
        self.started_at
            .lock()
            .unwrap()
            .map(|started| (Utc::now() - started).num_seconds())
            .unwrap_or(0)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.lock().unwrap()
    }

    pub fn last_sync_duration_ms(&self) -> u64 {
        self.last_sync_duration_ms.load(Ordering::Relaxed)
    }
}

pub struct AgentPollLoop {
    pub host_id: String,
    pub poll_interval: Duration,
    pub task_queue: Arc<dyn TaskSource>,
    pub handler_ctx: HandlerContext,
    pub stats: Arc<AgentStats>,
}

impl AgentPollLoop {
    /// Run the poll loop until `shutdown` resolves. Every long-running
    /// operation is implicitly cancellable by `tokio::select!` racing the
    /// shutdown signal at each iteration boundary.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        error!(host_id = %self.host_id, error = %e, "poll iteration failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(host_id = %self.host_id, "poll loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    #[instrument(skip(self), fields(host_id = %self.host_id))]
    async fn poll_once(&self) -> anyhow::Result<()> {
        let tick_started = std::time::Instant::now();
        let tasks = self.task_queue.poll(&self.host_id, POLL_LIMIT).await?;
        let task_count = tasks.len();
        let mut any_failed = false;
        for task in tasks {
            // A failure to post `running` is logged but does not block execution.
            if let Err(e) = self
                .task_queue
                .report_status(&task.id, TaskStatus::Running, None, None)
                .await
            {
                warn!(task_id = %task.id, error = %e, "failed to report running status");
            }

            let outcome = self.execute(task.kind, &task.payload).await;

            let report = match outcome {
                Ok(result) => {
                    self.task_queue
                        .report_status(&task.id, TaskStatus::Completed, None, Some(result))
                        .await
                }
                Err(message) => {
                    any_failed = true;
                    self.task_queue
                        .report_status(&task.id, TaskStatus::Failed, Some(message), None)
                        .await
                }
            };

            // A failure to post the terminal status is logged; the
            // server's reaper will recover the task via ReapExpired.
            if let Err(e) = report {
                any_failed = true;
                warn!(task_id = %task.id, error = %e, "failed to report terminal status");
            }
        }
        self.stats.record_sync(tick_started.elapsed(), task_count, any_failed);
        Ok(())
    }

    async fn execute(&self, kind: TaskKind, payload: &serde_json::Value) -> Result<serde_json::Value, String> {
        if kind == TaskKind::Workflow {
            let action: CompositeAction = serde_json::from_value(payload.clone()).map_err(|e| e.to_string())?;
            let executor = WorkflowExecutor::new(self.handler_ctx.clone());
            let result = executor.run(&action).await.map_err(|e| e.to_string())?;
            return serde_json::to_value(&result).map_err(|e| e.to_string());
        }

        handlers::dispatch(&self.handler_ctx, kind, payload)
            .await
            .map_err(|e| e.to_string())
    }
}
