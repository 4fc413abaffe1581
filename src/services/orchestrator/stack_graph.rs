//! Stack graph parsing and dependency-wave computation (§4.4).
//!
//! The stack graph arrives as a node/edge document with per-node type tags;
//! nodes are scanned for a `types: Vec<String>` discriminator set and
//! dispatched by tag presence rather than a single enum, so a node can
//! simultaneously be, e.g., both a `Stack` and an application-level node.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{ContainerSpec, Wave};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackGraphNode {
    pub id: String,
    pub types: Vec<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackGraphDocument {
    pub nodes: Vec<StackGraphNode>,
}

/// Parsed stack graph: an index of container specs by logical name. Built
/// once per orchestrator invocation; no back-pointers are persisted.
#[derive(Debug, Clone)]
pub struct StackGraph {
    pub containers: HashMap<String, ContainerSpec>,
}

impl StackGraph {
    pub fn parse(doc: &StackGraphDocument) -> GraphiumResult<Self> {
        let mut containers = HashMap::new();
        for node in &doc.nodes {
            if node.types.iter().any(|t| t == "Container") {
                let spec: ContainerSpec = serde_json::from_value(node.attributes.clone())
                    .map_err(|e| GraphiumError::Validation(format!("invalid container node {}: {e}", node.id)))?;
                containers.insert(spec.name.clone(), spec);
            }
        }
        Ok(Self { containers })
    }

    /// Validate that every `depends_on` name resolves to a container declared
    /// in this graph.
    pub fn validate_dependencies(&self) -> GraphiumResult<()> {
        for spec in self.containers.values() {
            for dep in &spec.depends_on {
                if !self.containers.contains_key(dep) {
                    return Err(GraphiumError::Validation(format!(
                        "container {} depends on undeclared container {dep}",
                        spec.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Kahn's-algorithm topological layering: wave `k+1` contains only
    /// containers whose entire `depends_on` set lies in waves `<= k`. A
    /// cycle among container dependencies is fatal.
    pub fn compute_waves(&self) -> GraphiumResult<Vec<Wave>> {
        self.validate_dependencies()?;

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for spec in self.containers.values() {
            in_degree.entry(spec.name.as_str()).or_insert(0);
            for dep in &spec.depends_on {
                *in_degree.entry(spec.name.as_str()).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(spec.name.as_str());
            }
        }

        let mut waves = Vec::new();
        let mut remaining: HashSet<&str> = in_degree.keys().copied().collect();
        let mut frontier: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        while !frontier.is_empty() {
            let wave: Wave = frontier.iter().map(|s| s.to_string()).collect();
            let mut next_frontier = VecDeque::new();

            for name in frontier.drain(..) {
                remaining.remove(name);
                if let Some(children) = dependents.get(name) {
                    for child in children {
                        if let Some(deg) = in_degree.get_mut(child) {
                            *deg -= 1;
                            if *deg == 0 {
                                next_frontier.push_back(*child);
                            }
                        }
                    }
                }
            }

            waves.push(wave);
            frontier = next_frontier;
        }

        if !remaining.is_empty() {
            let cyclic: Vec<String> = remaining.iter().map(|s| s.to_string()).collect();
            return Err(GraphiumError::DependencyCycle(cyclic));
        }

        Ok(waves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn container(name: &str, depends_on: &[&str]) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: "alpine:latest".to_string(),
            env: Map::new(),
            ports: Map::new(),
            mounts: Vec::new(),
            healthcheck: None,
            resources: Default::default(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            located_in_host: None,
            restart_policy: None,
        }
    }

    fn graph(containers: Vec<ContainerSpec>) -> StackGraph {
        StackGraph {
            containers: containers.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    #[test]
    fn linear_chain_produces_one_container_per_wave() {
        let g = graph(vec![
            container("db", &[]),
            container("api", &["db"]),
            container("web", &["api"]),
        ]);
        let waves = g.compute_waves().unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec!["db".to_string()]);
        assert_eq!(waves[1], vec!["api".to_string()]);
        assert_eq!(waves[2], vec!["web".to_string()]);
    }

    #[test]
    fn independent_containers_share_a_wave() {
        let g = graph(vec![
            container("db", &[]),
            container("cache", &[]),
            container("api", &["db", "cache"]),
        ]);
        let waves = g.compute_waves().unwrap();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].len(), 2);
    }

    #[test]
    fn cycle_is_rejected() {
        let g = graph(vec![container("a", &["b"]), container("b", &["a"])]);
        assert!(matches!(g.compute_waves(), Err(GraphiumError::DependencyCycle(_))));
    }

    #[test]
    fn undeclared_dependency_is_rejected() {
        let g = graph(vec![container("api", &["missing"])]);
        assert!(g.validate_dependencies().is_err());
    }
}
