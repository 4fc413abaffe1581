//! AgentConfig: declarative spec of a managed host, as registered with the
//! server. Immutable from the supervisor's perspective during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub host_id: String,
    pub name: String,
    /// Local socket, TCP address, or tunnel URL for the agent's runtime endpoint.
    pub runtime_endpoint: String,
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default = "default_sync_interval_seconds")]
    pub sync_interval_seconds: u64,
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_sync_interval_seconds() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    pub fn new(host_id: impl Into<String>, name: impl Into<String>, runtime_endpoint: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            name: name.into(),
            runtime_endpoint: runtime_endpoint.into(),
            key_path: None,
            datacenter: None,
            sync_interval_seconds: default_sync_interval_seconds(),
            auto_start: true,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host_id.trim().is_empty() {
            return Err("host_id must not be empty".to_string());
        }
        if self.runtime_endpoint.trim().is_empty() {
            return Err("runtime_endpoint must not be empty".to_string());
        }
        Ok(())
    }
}
