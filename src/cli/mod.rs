//! Thin CLI dispatcher wiring configuration, the database, and the core
//! services onto the command surface. The router, TLS, and process
//! supervision primitives stay in `services`/`infrastructure`; this module
//! only parses arguments and calls into them.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};
