//! DeploymentPlan: the in-memory output of stack placement planning.
//! Never persisted — it is recomputed per orchestrator invocation and is
//! exclusively owned by that invocation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

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
pub struct ResourceConstraints {
    #[serde(default)]
    pub min_cpu: Option<f64>,
    #[serde(default)]
    pub min_memory_mb: Option<u64>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// A single container in a stack graph, prior to host placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// container port -> host port, 0 meaning "assign ephemeral".
    #[serde(default)]
    pub ports: HashMap<u16, u16>,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub healthcheck: Option<HealthcheckSpec>,
    #[serde(default)]
    pub resources: ResourceConstraints,
    /// logical names of containers that must reach `running` first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub located_in_host: Option<String>,
    #[serde(default)]
    pub restart_policy: Option<String>,
}

/// Candidate host for placement, with current load snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCandidate {
    pub host_id: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub cpu_total: f64,
    pub cpu_free: f64,
    pub memory_total_mb: u64,
    pub memory_free_mb: u64,
    pub container_count: u32,
}

/// A topological partition of container names: every dependency of a
/// container in wave `k` names only containers in waves `< k`.
pub type Wave = Vec<String>;

/// In-memory result of stack placement planning. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub stack_id: String,
    pub container_specs: HashMap<String, ContainerSpec>,
    /// logical container name -> host id.
    pub host_map: HashMap<String, String>,
    pub network_spec: NetworkSpec,
    pub waves: Vec<Wave>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub mode: super::stack::NetworkMode,
    pub hosts: Vec<String>,
}

impl DeploymentPlan {
    pub fn total_containers(&self) -> usize {
        self.container_specs.len()
    }
}
