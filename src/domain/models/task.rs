//! Task domain model.
//!
//! A Task is the unit of work dispatched through the pull-based queue to a
//! single agent. Tasks form a DAG via `depends_on` and carry a kind-specific
//! opaque payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// What kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Deploy,
    Delete,
    Stop,
    Start,
    Restart,
    Check,
    Control,
    Transfer,
    Workflow,
    ContainerExec,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Delete => "delete",
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Restart => "restart",
            Self::Check => "check",
            Self::Control => "control",
            Self::Transfer => "transfer",
            Self::Workflow => "workflow",
            Self::ContainerExec => "container-exec",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deploy" => Some(Self::Deploy),
            "delete" => Some(Self::Delete),
            "stop" => Some(Self::Stop),
            "start" => Some(Self::Start),
            "restart" => Some(Self::Restart),
            "check" => Some(Self::Check),
            "control" => Some(Self::Control),
            "transfer" => Some(Self::Transfer),
            "workflow" => Some(Self::Workflow),
            "container-exec" => Some(Self::ContainerExec),
            _ => None,
        }
    }
}

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assigned" => Some(Self::Assigned),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states are absorbing: once reached, no further transition applies.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Legal transitions from this status, per spec.md §4.2.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::Assigned, Self::Running, Self::Cancelled],
            Self::Assigned => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

pub const DEFAULT_PRIORITY: u8 = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 300;

/// Immutable work descriptor with payload, status, and retry/timeout/dependency metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub revision: u64,
    pub kind: TaskKind,
    pub status: TaskStatus,
    #[serde(default)]
    pub agent_id: String,
    pub host_id: String,
    #[serde(default)]
    pub stack_id: Option<String>,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i64,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_timeout_seconds() -> i64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Task {
    /// Construct a new pending task, applying the defaults spec.md §4.2's
    /// `Submit` operation requires: generated id, default priority/retries/
    /// timeout, `pending` status.
    pub fn new(kind: TaskKind, host_id: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            revision: 0,
            kind,
            status: TaskStatus::Pending,
            agent_id: String::new(),
            host_id: host_id.into(),
            stack_id: None,
            container_id: None,
            priority: DEFAULT_PRIORITY,
            payload,
            created_at: now,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            depends_on: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Normalize a task submitted with partial fields: priority clamped to
    /// [0,10], `timeout_seconds=0` treated as "use the default" per §8
    /// boundary behaviors, `max_retries` defaulted if zero was never
    /// explicitly meant (submission always provides an explicit value from
    /// the caller, so only the documented zero-timeout special case applies).
    pub fn normalize(&mut self) {
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        self.priority = self.priority.min(10);
        if self.timeout_seconds == 0 {
            self.timeout_seconds = DEFAULT_TIMEOUT_SECONDS;
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.started_at {
            Some(started) if self.status == TaskStatus::Running => {
                (now - started).num_seconds() > self.timeout_seconds
            }
            _ => false,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Payload for `deploy` tasks (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl Default for PullPolicy {
    fn default() -> Self {
        Self::IfNotPresent
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthcheckSpec {
    pub test: Vec<String>,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default)]
    pub min_cpu: Option<f64>,
    #[serde(default)]
    pub min_memory_mb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPayload {
    pub image: String,
    #[serde(default)]
    pub pull_policy: PullPolicy,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// container port -> host port
    #[serde(default)]
    pub ports: HashMap<u16, u16>,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub resources: ResourceSpec,
    #[serde(default)]
    pub restart_policy: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub healthcheck: Option<HealthcheckSpec>,
    #[serde(default)]
    pub container_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePayload {
    pub container_id: String,
    #[serde(default)]
    pub stop_timeout: Option<u64>,
    #[serde(default)]
    pub remove_volumes: bool,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecyclePayload {
    pub container_id: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
    Pause,
    Unpause,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPayload {
    pub container_id: String,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckType {
    TlsCertificate,
    Http,
    ContainerHealth,
}

impl Default for CheckType {
    fn default() -> Self {
        Self::Http
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckPayload {
    #[serde(default)]
    pub check_type: CheckType,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub expected_status: Option<u16>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub warn_days: Option<i64>,
    /// `container_health` fields: the container to probe and the healthcheck
    /// command, mirroring the deploy-time `HealthcheckSpec`.
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPayload {
    pub container_id: String,
    #[serde(default)]
    pub lines: Option<usize>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerExecPayload {
    pub container_id: String,
    pub command: ExecCommand,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecCommand {
    List(Vec<String>),
    Shell(String),
}

impl ExecCommand {
    /// Resolve to an argv: a list is used verbatim, a single string is
    /// wrapped as `sh -c "…"` per spec.md §4.3.
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            Self::List(v) => v.clone(),
            Self::Shell(s) => vec!["sh".to_string(), "-c".to_string(), s.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_used_when_zero() {
        let mut task = Task::new(TaskKind::Deploy, "h1", serde_json::json!({}));
        task.timeout_seconds = 0;
        task.normalize();
        assert_eq!(task.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            assert!(terminal.valid_transitions().is_empty());
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn pending_cannot_jump_to_completed_directly() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn exec_command_shell_wraps_with_sh_c() {
        let cmd = ExecCommand::Shell("echo hi".to_string());
        assert_eq!(cmd.to_argv(), vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn task_kind_round_trips_through_str() {
        for kind in [
            TaskKind::Deploy,
            TaskKind::Delete,
            TaskKind::Stop,
            TaskKind::Start,
            TaskKind::Restart,
            TaskKind::Check,
            TaskKind::Control,
            TaskKind::Transfer,
            TaskKind::Workflow,
            TaskKind::ContainerExec,
        ] {
            assert_eq!(TaskKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn expiration_requires_running_status() {
        let mut task = Task::new(TaskKind::Deploy, "h1", serde_json::json!({}));
        task.status = TaskStatus::Pending;
        task.started_at = Some(Utc::now() - chrono::Duration::seconds(1000));
        assert!(!task.is_expired(Utc::now()));

        task.status = TaskStatus::Running;
        assert!(task.is_expired(Utc::now()));
    }
}
