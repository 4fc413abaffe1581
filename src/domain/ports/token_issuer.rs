//! TokenIssuer port - mint and verify the narrow bearer-token claim the
//! Supervisor needs for `StartAgent`. Deliberately not a full identity
//! provider: the signing secret's distribution is out of scope, but minting
//! the specific claim this operation requires is in scope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::GraphiumResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub host_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a bearer token bound to `host_id`, valid for `validity_seconds`.
    async fn mint(&self, host_id: &str, validity_seconds: i64) -> GraphiumResult<String>;

    /// Verify a bearer token's signature and expiry, returning its claims.
    async fn verify(&self, token: &str) -> GraphiumResult<TokenClaims>;
}
