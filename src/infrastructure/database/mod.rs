//! Database bootstrap: pool creation, embedded migrations, and the
//! per-entity `Store<T>` adapters the rest of the binary wires up.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::adapters::sqlite::{self, PoolConfig, SqliteJsonStore};
use crate::domain::models::{Agent, AgentConfig, DeploymentState, IgnoreEntry, Stack, Task};
use crate::domain::ports::Store;
use crate::infrastructure::config::DatabaseConfig;

pub struct Database {
    pub pool: SqlitePool,
    pub tasks: Arc<dyn Store<Task>>,
    pub agent_configs: Arc<dyn Store<AgentConfig>>,
    pub agents: Arc<dyn Store<Agent>>,
    pub stacks: Arc<dyn Store<Stack>>,
    pub deployment_states: Arc<dyn Store<DeploymentState>>,
    pub ignore_entries: Arc<dyn Store<IgnoreEntry>>,
}

impl Database {
    /// Opens the pool at `config.path`, runs any pending embedded
    /// migrations, and wires the per-entity stores around a single pool.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let url = format!("sqlite:{}", config.path);
        let pool = sqlite::create_pool(
            &url,
            Some(PoolConfig { max_connections: config.max_connections, ..PoolConfig::default() }),
        )
        .await?;

        let migrator = sqlite::Migrator::new(pool.clone());
        let applied = migrator.run_embedded_migrations(sqlite::all_embedded_migrations()).await?;
        tracing::info!(applied, "database migrations applied");

        Ok(Self::from_pool(pool))
    }

    #[cfg(test)]
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let pool = sqlite::create_test_pool().await?;
        let migrator = sqlite::Migrator::new(pool.clone());
        migrator.run_embedded_migrations(sqlite::all_embedded_migrations()).await?;
        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            tasks: Arc::new(SqliteJsonStore::for_tasks(pool.clone())),
            agent_configs: Arc::new(SqliteJsonStore::for_agent_configs(pool.clone())),
            agents: Arc::new(SqliteJsonStore::for_agents(pool.clone())),
            stacks: Arc::new(SqliteJsonStore::for_stacks(pool.clone())),
            deployment_states: Arc::new(SqliteJsonStore::for_deployment_states(pool.clone())),
            ignore_entries: Arc::new(SqliteJsonStore::for_ignore_entries(pool.clone())),
            pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Task;
    use crate::domain::ports::ListFilter;

    #[tokio::test]
    async fn round_trips_a_task_through_sqlite() {
        let db = Database::connect_in_memory().await.unwrap();
        let task = Task::new(crate::domain::models::TaskKind::Deploy, "host-1", serde_json::json!({}));
        db.tasks.put(&task.id, &task, None).await.unwrap();

        let fetched = db.tasks.get(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, task.id);

        let listed = db.tasks.list(&ListFilter::new().with_equals("host_id", "host-1")).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
