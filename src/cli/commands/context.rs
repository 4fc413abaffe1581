//! Shared state every subcommand (other than `config init`) builds before
//! dispatching: loaded configuration, the database, and the token issuer.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::http::HmacTokenIssuer;
use crate::domain::ports::TokenIssuer;
use crate::infrastructure::config::{ConfigLoader, GraphiumConfig};
use crate::infrastructure::database::Database;

pub struct AppContext {
    pub config: GraphiumConfig,
    pub db: Database,
    pub token_issuer: Arc<dyn TokenIssuer>,
}

impl AppContext {
    pub async fn load() -> Result<Self> {
        let config = ConfigLoader::load().context("failed to load configuration")?;
        let db = Database::connect(&config.database).await.context("failed to connect to database")?;
        let token_issuer: Arc<dyn TokenIssuer> =
            Arc::new(HmacTokenIssuer::new(config.server.hmac_secret.clone().into_bytes()));
        Ok(Self { config, db, token_issuer })
    }
}
