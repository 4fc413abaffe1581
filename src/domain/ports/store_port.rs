//! Store port - opaque persistence with optimistic revision concurrency.
//!
//! The Store is the sole owner of every persistent entity except
//! `AgentProcessState`, which the Supervisor keeps in memory only.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::errors::GraphiumResult;

/// Filter passed to `list`; adapters interpret `field`/`value` pairs
/// against whatever index they maintain (SQL `WHERE`, in-memory scan, …).
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub equals: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A single persistent collection (tasks, stacks, agents, …) addressed by
/// opaque string id with an optimistic revision token.
#[async_trait]
pub trait Store<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Fetch by id, or `None` if absent.
    async fn get(&self, id: &str) -> GraphiumResult<Option<T>>;

    /// Insert or update `value` at `id`. `expected_revision` is `None` for
    /// an initial insert; `Some(rev)` requires the stored revision to match
    /// `rev` or the call returns `GraphiumError::Conflict`. Returns the new
    /// revision on success.
    async fn put(&self, id: &str, value: &T, expected_revision: Option<u64>) -> GraphiumResult<u64>;

    async fn delete(&self, id: &str) -> GraphiumResult<()>;

    async fn list(&self, filter: &ListFilter) -> GraphiumResult<Vec<T>>;
}
