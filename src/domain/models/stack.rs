//! Stack: declarative multi-container application deployed across hosts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackStatus {
    Pending,
    Deploying,
    Running,
    Stopping,
    Stopped,
    Error,
    RollingBack,
    RolledBack,
}

impl Default for StackStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    SingleHost,
    MultiHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStrategy {
    Auto,
    Manual,
    Spread,
    Datacenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkMode {
    HostPort,
    Overlay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub mode: DeploymentMode,
    pub placement_strategy: PlacementStrategy,
    pub network_mode: NetworkMode,
    #[serde(default = "default_true")]
    pub create_network_if_not_exists: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,
    pub revision: u64,
    pub name: String,
    pub status: StackStatus,
    #[serde(default)]
    pub datacenter: Option<String>,
    pub deployment_config: DeploymentConfig,
    /// Logical names of the containers declared in this stack's graph.
    pub containers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl Stack {
    pub fn new(name: impl Into<String>, deployment_config: DeploymentConfig, containers: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            revision: 0,
            name: name.into(),
            status: StackStatus::Pending,
            datacenter: None,
            deployment_config,
            containers,
            created_at: now,
            updated_at: now,
            deployed_at: None,
        }
    }
}
