//! Infrastructure layer: concrete adapters for external dependencies that
//! sit above `adapters/` — config loading, logging setup, and the
//! database bootstrap that wires SQLite pool, migrations, and stores.

pub mod config;
pub mod database;
pub mod logging;
