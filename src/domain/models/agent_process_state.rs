//! Runtime state of a supervised agent process. Ephemeral — owned
//! exclusively by the Supervisor, never persisted through the Store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl Default for ProcessStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl ProcessStatus {
    /// The wait-watcher is the sole transition authority once `Starting`
    /// succeeds; `StopAgent` coordinates with it via the interrupt signal
    /// rather than mutating state directly.
    pub fn valid_transitions(&self) -> &'static [ProcessStatus] {
        match self {
            Self::Stopped => &[Self::Starting],
            Self::Starting => &[Self::Running, Self::Failed],
            Self::Running => &[Self::Stopping, Self::Failed],
            Self::Stopping => &[Self::Stopped, Self::Failed],
            Self::Failed => &[Self::Starting],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Stable: only the wait-watcher writes a way out of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// Ephemeral per-config runtime record. `config_id` matches an
/// `AgentConfig::host_id`; configs with no live entry are reported as
/// `stopped` by `GetAgentState`/`ListAgentStates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProcessState {
    pub config_id: String,
    pub status: ProcessStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub process_id: Option<i32>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Fingerprint (not the raw secret) of the bearer token minted for this
    /// agent's current run, for audit/log correlation.
    #[serde(default)]
    pub bearer_token_fingerprint: Option<String>,
}

impl AgentProcessState {
    pub fn stopped(config_id: impl Into<String>) -> Self {
        Self {
            config_id: config_id.into(),
            status: ProcessStatus::Stopped,
            started_at: None,
            stopped_at: None,
            process_id: None,
            error_message: None,
            bearer_token_fingerprint: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.status, ProcessStatus::Starting | ProcessStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_only_reachable_from_starting_or_running() {
        assert!(ProcessStatus::Starting.can_transition_to(ProcessStatus::Failed));
        assert!(ProcessStatus::Running.can_transition_to(ProcessStatus::Failed));
        assert!(!ProcessStatus::Stopped.can_transition_to(ProcessStatus::Failed));
    }

    #[test]
    fn absent_config_reports_stopped_and_not_alive() {
        let state = AgentProcessState::stopped("host-1");
        assert_eq!(state.status, ProcessStatus::Stopped);
        assert!(!state.is_alive());
    }

    #[test]
    fn failed_can_restart_to_starting() {
        assert!(ProcessStatus::Failed.can_transition_to(ProcessStatus::Starting));
    }
}
