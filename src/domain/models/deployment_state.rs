//! DeploymentState: a live snapshot of a stack rollout in progress or completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stack::StackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStatus {
    Pending,
    Deploying,
    Running,
    Failed,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub container_id: String,
    pub host_id: String,
    #[serde(default)]
    pub ip: Option<String>,
    /// container port -> host port
    #[serde(default)]
    pub ports: HashMap<u16, u16>,
    pub status: PlacementStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentEventKind {
    WaveStarted,
    WaveCompleted,
    ContainerFailed,
    RollbackStarted,
    RollbackCompleted,
    RollbackFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: DeploymentEventKind,
    pub message: String,
    #[serde(default)]
    pub container: Option<String>,
}

impl DeploymentEvent {
    pub fn new(kind: DeploymentEventKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            container: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackState {
    pub removed_containers: Vec<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    pub stack_id: String,
    pub revision: u64,
    pub status: StackStatus,
    pub phase: String,
    /// 0-100.
    pub progress: u8,
    /// logical container name -> placement.
    pub placements: HashMap<String, Placement>,
    #[serde(default)]
    pub network_info: HashMap<String, String>,
    #[serde(default)]
    pub volume_info: HashMap<String, String>,
    pub events: Vec<DeploymentEvent>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rollback_state: Option<RollbackState>,
}

impl DeploymentState {
    pub fn new(stack_id: impl Into<String>) -> Self {
        Self {
            stack_id: stack_id.into(),
            revision: 0,
            status: StackStatus::Pending,
            phase: "initializing".to_string(),
            progress: 0,
            placements: HashMap::new(),
            network_info: HashMap::new(),
            volume_info: HashMap::new(),
            events: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            rollback_state: None,
        }
    }

    pub fn push_event(&mut self, event: DeploymentEvent) {
        self.events.push(event);
    }
}
