pub mod runtime;
pub mod store;

pub use runtime::FakeRuntime;
pub use store::MemoryStore;

use std::collections::HashMap;

use crate::domain::models::{Agent, Stack, Task};

impl MemoryStore<Task> {
    /// A `Task` store indexed by the fields the task queue filters on.
    pub fn for_tasks() -> Self {
        Self::with_field_extractor(|task: &Task| {
            let mut fields = HashMap::new();
            fields.insert("host_id".to_string(), task.host_id.clone());
            fields.insert("status".to_string(), task.status.as_str().to_string());
            if let Some(stack_id) = &task.stack_id {
                fields.insert("stack_id".to_string(), stack_id.clone());
            }
            fields
        })
    }
}

impl MemoryStore<Stack> {
    pub fn for_stacks() -> Self {
        Self::with_field_extractor(|stack: &Stack| {
            let mut fields = HashMap::new();
            fields.insert("name".to_string(), stack.name.clone());
            fields
        })
    }
}

impl MemoryStore<Agent> {
    pub fn for_agents() -> Self {
        Self::with_field_extractor(|agent: &Agent| {
            let mut fields = HashMap::new();
            if let Some(dc) = &agent.datacenter {
                fields.insert("datacenter".to_string(), dc.clone());
            }
            fields
        })
    }
}
