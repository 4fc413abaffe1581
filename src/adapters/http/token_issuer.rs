//! HMAC-signed bearer tokens: the `TokenIssuer` port backing both the
//! Supervisor's `StartAgent` minting and the server API's request auth.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::ports::token_issuer::{TokenClaims, TokenIssuer};

type HmacSha256 = Hmac<Sha256>;

/// Signs `{host_id}.{issued_at}.{expires_at}` with a shared secret, base64
/// encoding payload and signature as `<payload>.<sig>`.
pub struct HmacTokenIssuer {
    secret: Vec<u8>,
}

impl HmacTokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    fn sign(&self, payload: &str) -> GraphiumResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| GraphiumError::Unauthorized(format!("invalid signing key: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl TokenIssuer for HmacTokenIssuer {
    async fn mint(&self, host_id: &str, validity_seconds: i64) -> GraphiumResult<String> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(validity_seconds);
        let claims = TokenClaims { host_id: host_id.to_string(), issued_at, expires_at };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    async fn verify(&self, token: &str) -> GraphiumResult<TokenClaims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| GraphiumError::Unauthorized("malformed token".to_string()))?;

        let expected = self.sign(payload)?;
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(GraphiumError::Unauthorized("token signature mismatch".to_string()));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| GraphiumError::Unauthorized(format!("malformed token payload: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&raw)?;

        if claims.expires_at < Utc::now() {
            return Err(GraphiumError::Unauthorized("token expired".to_string()));
        }

        Ok(claims)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Convenience used by `check`-style freshness reporting, kept here since
/// it's the only place a `TokenClaims` timestamp gets compared casually.
pub fn is_expiring_within(claims: &TokenClaims, horizon: Duration) -> bool {
    claims.expires_at - Utc::now() < horizon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_minted_token() {
        let issuer = HmacTokenIssuer::new(b"test-secret".to_vec());
        let token = issuer.mint("host-1", 3600).await.unwrap();
        let claims = issuer.verify(&token).await.unwrap();
        assert_eq!(claims.host_id, "host-1");
    }

    #[tokio::test]
    async fn rejects_a_token_signed_with_a_different_secret() {
        let issuer_a = HmacTokenIssuer::new(b"secret-a".to_vec());
        let issuer_b = HmacTokenIssuer::new(b"secret-b".to_vec());
        let token = issuer_a.mint("host-1", 3600).await.unwrap();
        assert!(issuer_b.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_an_expired_token() {
        let issuer = HmacTokenIssuer::new(b"test-secret".to_vec());
        let token = issuer.mint("host-1", -1).await.unwrap();
        assert!(issuer.verify(&token).await.is_err());
    }
}
