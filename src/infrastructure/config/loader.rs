use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::types::GraphiumConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extraction(#[source] figment::Error),

    #[error("server.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("database.path must not be empty")]
    EmptyDatabasePath,

    #[error("database.max_connections must be at least 1")]
    InvalidMaxConnections,

    #[error("logging.level must be one of trace, debug, info, warn, error, got {0}")]
    InvalidLogLevel(String),

    #[error("logging.format must be one of json, pretty, got {0}")]
    InvalidLogFormat(String),
}

/// Loads config with precedence (lowest to highest): programmatic defaults,
/// `.graphium/config.yaml`, `.graphium/local.yaml`, then `GRAPHIUM_`-prefixed
/// environment variables.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<GraphiumConfig, ConfigError> {
        let config: GraphiumConfig = Figment::new()
            .merge(Serialized::defaults(GraphiumConfig::default()))
            .merge(Yaml::file(".graphium/config.yaml"))
            .merge(Yaml::file(".graphium/local.yaml"))
            .merge(Env::prefixed("GRAPHIUM_").split("__"))
            .extract()
            .map_err(ConfigError::Extraction)?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<GraphiumConfig, ConfigError> {
        let config: GraphiumConfig = Figment::new()
            .merge(Serialized::defaults(GraphiumConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .map_err(ConfigError::Extraction)?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &GraphiumConfig) -> Result<(), ConfigError> {
        if config.server.bind_address.trim().is_empty() {
            return Err(ConfigError::EmptyBindAddress);
        }
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        const FORMATS: [&str; 2] = ["json", "pretty"];
        if !FORMATS.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GraphiumConfig::default();
        ConfigLoader::validate(&config).expect("default config should validate");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = GraphiumConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn rejects_zero_max_connections() {
        let mut config = GraphiumConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxConnections)));
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() {
        let yaml = "server:\n  bind_address: \"127.0.0.1:9000\"\nlogging:\n  level: debug\n";
        let config: GraphiumConfig = Figment::new()
            .merge(Serialized::defaults(GraphiumConfig::default()))
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database.path, GraphiumConfig::default().database.path);
    }
}
