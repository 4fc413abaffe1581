//! Agent: the registered identity record for a host, distinct from
//! `AgentConfig` (the supervisor's declarative launch spec). Persisted via
//! the Store so the server can answer query/topology requests without
//! consulting the live Supervisor process map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub host_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Equal to the owning host's `host_id`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    pub token_claims: TokenClaims,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.token_claims.expires_at
    }
}
