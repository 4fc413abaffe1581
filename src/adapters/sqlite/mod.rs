//! SQLite-backed adapters: connection pooling, embedded migrations, and the
//! per-entity `Store<T>` implementations used outside of tests.

pub mod connection;
pub mod migrations;
pub mod store_repository;

pub use connection::{create_pool, create_test_pool, PoolConfig};
pub use migrations::{all_embedded_migrations, Migrator};
pub use store_repository::{SqliteJsonStore, TableSchema};

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::domain::models::{Agent, AgentConfig, DeploymentState, IgnoreEntry, Stack, Task};

impl SqliteJsonStore<Task> {
    pub fn for_tasks(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "tasks",
                id_column: "id",
                filter_columns: &["host_id", "status", "stack_id", "priority", "created_at"],
            },
            |task: &Task| {
                let mut fields = HashMap::new();
                fields.insert("host_id".to_string(), task.host_id.clone());
                fields.insert("status".to_string(), task.status.as_str().to_string());
                fields.insert("stack_id".to_string(), task.stack_id.clone().unwrap_or_default());
                fields.insert("priority".to_string(), task.priority.to_string());
                fields.insert("created_at".to_string(), task.created_at.to_rfc3339());
                fields
            },
        )
    }
}

impl SqliteJsonStore<AgentConfig> {
    pub fn for_agent_configs(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "agent_configs",
                id_column: "host_id",
                filter_columns: &["enabled"],
            },
            |config: &AgentConfig| {
                let mut fields = HashMap::new();
                fields.insert("enabled".to_string(), (config.enabled as i64).to_string());
                fields
            },
        )
    }
}

impl SqliteJsonStore<Agent> {
    pub fn for_agents(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "agents",
                id_column: "id",
                filter_columns: &["datacenter"],
            },
            |agent: &Agent| {
                let mut fields = HashMap::new();
                fields.insert("datacenter".to_string(), agent.datacenter.clone().unwrap_or_default());
                fields
            },
        )
    }
}

impl SqliteJsonStore<Stack> {
    pub fn for_stacks(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "stacks",
                id_column: "id",
                filter_columns: &["name", "status"],
            },
            |stack: &Stack| {
                let mut fields = HashMap::new();
                fields.insert("name".to_string(), stack.name.clone());
                fields.insert("status".to_string(), format!("{:?}", stack.status).to_lowercase());
                fields
            },
        )
    }
}

impl SqliteJsonStore<DeploymentState> {
    pub fn for_deployment_states(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "deployment_states",
                id_column: "stack_id",
                filter_columns: &["status"],
            },
            |state: &DeploymentState| {
                let mut fields = HashMap::new();
                fields.insert("status".to_string(), format!("{:?}", state.status).to_lowercase());
                fields
            },
        )
    }
}

impl SqliteJsonStore<IgnoreEntry> {
    /// `IgnoreEntry` keys on the `(container_id, host_id)` composite, so the
    /// id passed to `get`/`put`/`delete` is `"{container_id}:{host_id}"` and
    /// stored under a synthetic `id` primary key, with `container_id`/
    /// `host_id` kept as indexed filter columns for `list`.
    pub fn for_ignore_entries(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            TableSchema {
                table: "ignore_entries",
                id_column: "id",
                filter_columns: &["container_id", "host_id"],
            },
            |entry: &IgnoreEntry| {
                let mut fields = HashMap::new();
                fields.insert("container_id".to_string(), entry.container_id.clone());
                fields.insert("host_id".to_string(), entry.host_id.clone());
                fields
            },
        )
    }
}

/// Builds the composite id `SqliteJsonStore<IgnoreEntry>` expects.
pub fn ignore_entry_id(container_id: &str, host_id: &str) -> String {
    format!("{container_id}:{host_id}")
}
