//! `graphium token agent`: mint a bearer token outside of the supervisor's
//! own `StartAgent` minting path, e.g. to hand to a manually launched agent.

use anyhow::{Context, Result};

use crate::adapters::http::HmacTokenIssuer;
use crate::cli::commands::context::AppContext;
use crate::cli::output;
use crate::domain::ports::TokenIssuer;

pub async fn handle_agent(ctx: AppContext, host_id: String, expiration_hours: i64, secret: Option<String>, json: bool) -> Result<()> {
    let validity_seconds = expiration_hours.saturating_mul(3600);

    let token = match secret {
        Some(secret) => {
            let issuer = HmacTokenIssuer::new(secret.into_bytes());
            issuer.mint(&host_id, validity_seconds).await.context("failed to mint token")?
        }
        None => ctx.token_issuer.mint(&host_id, validity_seconds).await.context("failed to mint token")?,
    };

    if json {
        println!("{}", serde_json::json!({ "host_id": host_id, "token": token, "expiration_hours": expiration_hours }));
    } else {
        println!("{token}");
    }
    Ok(())
}
