//! Adapters: concrete implementations of the domain ports.

pub mod http;
pub mod memory;
pub mod sqlite;
