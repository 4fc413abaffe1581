//! Graphium: multi-host container orchestration control plane.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
