//! Layered configuration: programmatic defaults, a project YAML file, and
//! `GRAPHIUM_`-prefixed environment overrides, merged with `figment`.

mod loader;
mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{DatabaseConfig, GraphiumConfig, LoggingConfig, ServerConfig, SupervisorConfig};
