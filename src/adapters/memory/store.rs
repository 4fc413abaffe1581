//! Pure in-memory `Store` implementation.
//!
//! Satisfies the full `Store` port with no external dependency; used by
//! unit tests and as the default for single-node/ephemeral deployments.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::ports::{ListFilter, Store};

struct Entry<T> {
    value: T,
    revision: u64,
    /// Flattened string fields used by `ListFilter::equals`, populated by the caller.
    fields: HashMap<String, String>,
}

pub struct MemoryStore<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    /// Extracts the filterable fields (e.g. `host_id`, `status`) from a value.
    field_extractor: Box<dyn Fn(&T) -> HashMap<String, String> + Send + Sync>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self
    where
        T: Send + Sync,
    {
        Self {
            entries: RwLock::new(HashMap::new()),
            field_extractor: Box::new(|_| HashMap::new()),
        }
    }

    pub fn with_field_extractor(extractor: impl Fn(&T) -> HashMap<String, String> + Send + Sync + 'static) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            field_extractor: Box::new(extractor),
        }
    }
}

impl<T> Default for MemoryStore<T>
where
    T: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Store<T> for MemoryStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> GraphiumResult<Option<T>> {
        let guard = self.entries.read().expect("memory store lock poisoned");
        Ok(guard.get(id).map(|e| e.value.clone()))
    }

    async fn put(&self, id: &str, value: &T, expected_revision: Option<u64>) -> GraphiumResult<u64> {
        let mut guard = self.entries.write().expect("memory store lock poisoned");
        let new_revision = match guard.get(id) {
            Some(existing) => {
                if expected_revision != Some(existing.revision) {
                    return Err(GraphiumError::Conflict {
                        entity: std::any::type_name::<T>().to_string(),
                        id: id.to_string(),
                    });
                }
                existing.revision + 1
            }
            None => {
                if expected_revision.is_some() {
                    return Err(GraphiumError::Conflict {
                        entity: std::any::type_name::<T>().to_string(),
                        id: id.to_string(),
                    });
                }
                0
            }
        };

        let fields = (self.field_extractor)(value);
        guard.insert(
            id.to_string(),
            Entry {
                value: value.clone(),
                revision: new_revision,
                fields,
            },
        );
        Ok(new_revision)
    }

    async fn delete(&self, id: &str) -> GraphiumResult<()> {
        let mut guard = self.entries.write().expect("memory store lock poisoned");
        guard.remove(id);
        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> GraphiumResult<Vec<T>> {
        let guard = self.entries.read().expect("memory store lock poisoned");
        let mut out: Vec<T> = guard
            .values()
            .filter(|entry| {
                filter
                    .equals
                    .iter()
                    .all(|(field, value)| entry.fields.get(field).map(|v| v == value).unwrap_or(false))
            })
            .map(|entry| entry.value.clone())
            .collect();
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}
