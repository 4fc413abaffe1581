//! TaskQueueService: durable work broker with pull semantics (§4.2).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::{ListFilter, Store};

/// Coordinates task submission, poll gating, and status-report transitions
/// over a generic `Store<Task>`.
pub struct TaskQueueService {
    pub(crate) store: Arc<dyn Store<Task>>,
}

impl TaskQueueService {
    pub fn new(store: Arc<dyn Store<Task>>) -> Self {
        Self { store }
    }

    /// `Submit(task)`: generate id if absent; default priority/retries/
    /// timeout already applied by `Task::new`/`normalize`; persist as `pending`.
    #[instrument(skip(self, task), fields(task_id = %task.id, kind = ?task.kind))]
    pub async fn submit(&self, mut task: Task) -> GraphiumResult<Task> {
        task.normalize();
        task.status = TaskStatus::Pending;
        self.store.put(&task.id, &task, None).await?;
        info!(task_id = %task.id, "task submitted");
        Ok(task)
    }

    /// `Poll(agent_id, limit)`: tasks pending for this agent's host with all
    /// dependencies completed, ordered priority desc then created_at asc.
    #[instrument(skip(self))]
    pub async fn poll(&self, host_id: &str, limit: usize) -> GraphiumResult<Vec<Task>> {
        let limit = limit.min(10);
        let filter = ListFilter::new().with_equals("host_id", host_id);
        let candidates = self.store.list(&filter).await?;

        let completed: std::collections::HashSet<String> = candidates
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.id.clone())
            .collect();

        let mut eligible: Vec<Task> = candidates
            .into_iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| t.depends_on.iter().all(|dep| completed.contains(dep)))
            .collect();

        eligible.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        eligible.truncate(limit);
        Ok(eligible)
    }

    /// `ReportStatus`: atomically transition via the store's revision check.
    /// Duplicate terminal reports are idempotent: the first terminal
    /// transition wins, later divergent ones are rejected with a
    /// programmer-kind conflict.
    #[instrument(skip(self, error, result))]
    pub async fn report_status(
        &self,
        task_id: &str,
        new_status: TaskStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> GraphiumResult<Task> {
        let Some(mut task) = self.store.get(task_id).await? else {
            return Err(GraphiumError::TaskNotFound(task_id.to_string()));
        };

        if task.status.is_terminal() {
            // Idempotent on terminal states: accept a repeat of the same
            // terminal status, reject a divergent one.
            if task.status == new_status {
                return Ok(task);
            }
            return Err(GraphiumError::InvalidStateTransition {
                from: task.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        if !task.status.can_transition_to(new_status) {
            return Err(GraphiumError::InvalidStateTransition {
                from: task.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        let revision = task.revision;
        let now = Utc::now();
        match new_status {
            TaskStatus::Running => task.started_at = Some(now),
            TaskStatus::Completed => {
                task.completed_at = Some(now);
                task.result = result;
            }
            TaskStatus::Failed => {
                task.error = error.clone();
                if task.can_retry() {
                    task.retry_count += 1;
                    task.status = TaskStatus::Pending;
                    task.assigned_at = None;
                    task.started_at = None;
                    let new_rev = self.store.put(&task.id, &task, Some(revision)).await?;
                    task.revision = new_rev;
                    warn!(task_id = %task_id, retry_count = task.retry_count, "task failed, retrying");
                    return Ok(task);
                }
                task.completed_at = Some(now);
            }
            TaskStatus::Cancelled => task.completed_at = Some(now),
            TaskStatus::Assigned => task.assigned_at = Some(now),
            TaskStatus::Pending => {}
        }
        task.status = new_status;

        let new_rev = self.store.put(&task.id, &task, Some(revision)).await?;
        task.revision = new_rev;
        Ok(task)
    }

    /// `ReapExpired()`: scan running tasks past their timeout and transition
    /// them to `failed` (retry-eligible via `report_status`).
    #[instrument(skip(self))]
    pub async fn reap_expired(&self) -> GraphiumResult<usize> {
        let all = self.store.list(&ListFilter::new()).await?;
        let now = Utc::now();
        let mut reaped = 0;
        for task in all {
            if task.status == TaskStatus::Running && task.is_expired(now) {
                self.report_status(
                    &task.id,
                    TaskStatus::Failed,
                    Some("task exceeded timeout_seconds".to_string()),
                    None,
                )
                .await?;
                reaped += 1;
            }
        }
        Ok(reaped)
    }

    pub async fn get(&self, task_id: &str) -> GraphiumResult<Option<Task>> {
        self.store.get(task_id).await
    }

    pub async fn list(&self, filter: &ListFilter) -> GraphiumResult<Vec<Task>> {
        self.store.list(filter).await
    }

    /// Cancel a task that has not yet reached a terminal state.
    #[instrument(skip(self))]
    pub async fn cancel(&self, task_id: &str) -> GraphiumResult<Task> {
        self.report_status(task_id, TaskStatus::Cancelled, None, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::models::TaskKind;

    fn queue() -> TaskQueueService {
        TaskQueueService::new(Arc::new(MemoryStore::for_tasks()))
    }

    #[tokio::test]
    async fn poll_respects_priority_then_created_at() {
        let svc = queue();
        let mut low = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        low.priority = 1;
        let mut high = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        high.priority = 9;
        svc.submit(low.clone()).await.unwrap();
        svc.submit(high.clone()).await.unwrap();

        let polled = svc.poll("host-1", 10).await.unwrap();
        assert_eq!(polled[0].id, high.id);
        assert_eq!(polled[1].id, low.id);
    }

    #[tokio::test]
    async fn poll_withholds_tasks_with_incomplete_dependencies() {
        let svc = queue();
        let dep = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        svc.submit(dep.clone()).await.unwrap();

        let mut dependent = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        dependent.depends_on = vec![dep.id.clone()];
        svc.submit(dependent.clone()).await.unwrap();

        let polled = svc.poll("host-1", 10).await.unwrap();
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].id, dep.id);
    }

    #[tokio::test]
    async fn failed_task_retries_until_max_retries_exhausted() {
        let svc = queue();
        let mut task = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        task.max_retries = 1;
        svc.submit(task.clone()).await.unwrap();

        svc.report_status(&task.id, TaskStatus::Running, None, None).await.unwrap();
        let retried = svc
            .report_status(&task.id, TaskStatus::Failed, Some("boom".into()), None)
            .await
            .unwrap();
        assert_eq!(retried.status, TaskStatus::Pending);
        assert_eq!(retried.retry_count, 1);

        svc.report_status(&retried.id, TaskStatus::Running, None, None).await.unwrap();
        let failed = svc
            .report_status(&retried.id, TaskStatus::Failed, Some("boom again".into()), None)
            .await
            .unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn duplicate_terminal_report_is_idempotent() {
        let svc = queue();
        let task = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        svc.submit(task.clone()).await.unwrap();
        svc.report_status(&task.id, TaskStatus::Running, None, None).await.unwrap();
        svc.report_status(&task.id, TaskStatus::Completed, None, Some(serde_json::json!({"ok": true})))
            .await
            .unwrap();

        let repeat = svc
            .report_status(&task.id, TaskStatus::Completed, None, Some(serde_json::json!({"ok": true})))
            .await
            .unwrap();
        assert_eq!(repeat.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn reap_expired_fails_timed_out_running_tasks() {
        let svc = queue();
        let mut task = Task::new(TaskKind::Deploy, "host-1", serde_json::json!({}));
        task.timeout_seconds = 1;
        svc.submit(task.clone()).await.unwrap();
        svc.report_status(&task.id, TaskStatus::Running, None, None).await.unwrap();

        // Force started_at into the past to simulate an expired task.
        let mut stored = svc.get(&task.id).await.unwrap().unwrap();
        stored.started_at = Some(Utc::now() - chrono::Duration::seconds(10));
        svc.store.put(&stored.id, &stored, Some(stored.revision)).await.unwrap();

        let reaped = svc.reap_expired().await.unwrap();
        assert_eq!(reaped, 1);
        let after = svc.get(&task.id).await.unwrap().unwrap();
        assert!(matches!(after.status, TaskStatus::Failed | TaskStatus::Pending));
    }
}
