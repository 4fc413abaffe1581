//! Placement strategies: bind each container in a stack graph to a host
//! (§4.4 "Placement algorithm").

use std::collections::HashMap;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{ContainerSpec, HostCandidate, PlacementStrategy};

/// Resolve `host_map`: logical container name -> host id, given the
/// selected strategy and the candidate hosts' current load.
pub fn plan_placements(
    containers: &HashMap<String, ContainerSpec>,
    hosts: &[HostCandidate],
    strategy: PlacementStrategy,
    datacenter: Option<&str>,
) -> GraphiumResult<HashMap<String, String>> {
    match strategy {
        PlacementStrategy::Manual => plan_manual(containers),
        PlacementStrategy::Datacenter => {
            let dc = datacenter
                .ok_or_else(|| GraphiumError::Validation("datacenter strategy requires a target datacenter".into()))?;
            let restricted: Vec<HostCandidate> = hosts
                .iter()
                .filter(|h| h.datacenter.as_deref() == Some(dc))
                .cloned()
                .collect();
            if restricted.is_empty() {
                return Err(GraphiumError::PlacementUnsatisfiable(format!(
                    "no candidate hosts in datacenter {dc}"
                )));
            }
            plan_auto(containers, &restricted)
        }
        PlacementStrategy::Spread => plan_spread(containers, hosts),
        PlacementStrategy::Auto => plan_auto(containers, hosts),
    }
}

fn plan_manual(containers: &HashMap<String, ContainerSpec>) -> GraphiumResult<HashMap<String, String>> {
    let mut host_map = HashMap::new();
    for spec in containers.values() {
        let host = spec
            .located_in_host
            .clone()
            .ok_or_else(|| GraphiumError::PlacementUnsatisfiable(format!("{} has no located_in_host", spec.name)))?;
        host_map.insert(spec.name.clone(), host);
    }
    Ok(host_map)
}

fn eligible_hosts<'a>(spec: &ContainerSpec, hosts: &'a [HostCandidate]) -> Vec<&'a HostCandidate> {
    hosts
        .iter()
        .filter(|h| {
            let meets_cpu = spec.resources.min_cpu.map(|c| h.cpu_free >= c).unwrap_or(true);
            let meets_mem = spec
                .resources
                .min_memory_mb
                .map(|m| h.memory_free_mb >= m)
                .unwrap_or(true);
            let meets_labels = spec
                .resources
                .labels
                .iter()
                .all(|(k, v)| h.labels.get(k).map(|hv| hv == v).unwrap_or(false));
            meets_cpu && meets_mem && meets_labels
        })
        .collect()
}

/// Weighted score favoring hosts with more free CPU/memory and fewer
/// already-assigned containers.
fn score_host(host: &HostCandidate, assigned_in_plan: u32) -> f64 {
    let free_cpu_ratio = if host.cpu_total > 0.0 {
        host.cpu_free / host.cpu_total
    } else {
        0.0
    };
    let free_mem_ratio = if host.memory_total_mb > 0 {
        host.memory_free_mb as f64 / host.memory_total_mb as f64
    } else {
        0.0
    };
    let load_penalty = (host.container_count + assigned_in_plan) as f64;
    0.5 * free_cpu_ratio + 0.5 * free_mem_ratio - 0.01 * load_penalty
}

fn plan_auto(
    containers: &HashMap<String, ContainerSpec>,
    hosts: &[HostCandidate],
) -> GraphiumResult<HashMap<String, String>> {
    let mut host_map = HashMap::new();
    let mut assigned_counts: HashMap<String, u32> = HashMap::new();

    let mut names: Vec<&String> = containers.keys().collect();
    names.sort();

    for name in names {
        let spec = &containers[name];
        let candidates = eligible_hosts(spec, hosts);
        if candidates.is_empty() {
            return Err(GraphiumError::PlacementUnsatisfiable(format!(
                "no eligible host for container {name}"
            )));
        }
        let best = candidates
            .into_iter()
            .max_by(|a, b| {
                let score_a = score_host(a, *assigned_counts.get(&a.host_id).unwrap_or(&0));
                let score_b = score_host(b, *assigned_counts.get(&b.host_id).unwrap_or(&0));
                score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("non-empty candidate list");
        *assigned_counts.entry(best.host_id.clone()).or_insert(0) += 1;
        host_map.insert(name.clone(), best.host_id.clone());
    }

    Ok(host_map)
}

fn plan_spread(
    containers: &HashMap<String, ContainerSpec>,
    hosts: &[HostCandidate],
) -> GraphiumResult<HashMap<String, String>> {
    if hosts.is_empty() {
        return Err(GraphiumError::PlacementUnsatisfiable("no candidate hosts".into()));
    }
    let mut host_map = HashMap::new();
    let mut assigned_counts: HashMap<String, u32> = hosts.iter().map(|h| (h.host_id.clone(), h.container_count)).collect();
    let mut free_memory: HashMap<String, u64> = hosts.iter().map(|h| (h.host_id.clone(), h.memory_free_mb)).collect();

    let mut specs: Vec<&ContainerSpec> = containers.values().collect();
    specs.sort_by(|a, b| {
        b.resources
            .min_memory_mb
            .unwrap_or(0)
            .cmp(&a.resources.min_memory_mb.unwrap_or(0))
            .then(a.name.cmp(&b.name))
    });

    for spec in specs {
        let best = hosts
            .iter()
            .min_by(|a, b| {
                let count_a = assigned_counts.get(&a.host_id).copied().unwrap_or(0);
                let count_b = assigned_counts.get(&b.host_id).copied().unwrap_or(0);
                count_a.cmp(&count_b).then_with(|| {
                    let mem_b = free_memory.get(&b.host_id).copied().unwrap_or(0);
                    let mem_a = free_memory.get(&a.host_id).copied().unwrap_or(0);
                    mem_b.cmp(&mem_a)
                })
            })
            .ok_or_else(|| GraphiumError::PlacementUnsatisfiable(format!("no eligible host for {}", spec.name)))?;

        *assigned_counts.entry(best.host_id.clone()).or_insert(0) += 1;
        if let Some(mem) = spec.resources.min_memory_mb {
            if let Some(free) = free_memory.get_mut(&best.host_id) {
                *free = free.saturating_sub(mem);
            }
        }
        host_map.insert(spec.name.clone(), best.host_id.clone());
    }

    Ok(host_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn container(name: &str, min_mem: Option<u64>) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: "alpine:latest".to_string(),
            env: Map::new(),
            ports: Map::new(),
            mounts: Vec::new(),
            healthcheck: None,
            resources: crate::domain::models::ResourceConstraints {
                min_cpu: None,
                min_memory_mb: min_mem,
                labels: Map::new(),
            },
            depends_on: Vec::new(),
            located_in_host: None,
            restart_policy: None,
        }
    }

    fn host(id: &str, free_mb: u64, count: u32) -> HostCandidate {
        HostCandidate {
            host_id: id.to_string(),
            datacenter: None,
            labels: Map::new(),
            cpu_total: 4.0,
            cpu_free: 4.0,
            memory_total_mb: 8192,
            memory_free_mb: free_mb,
            container_count: count,
        }
    }

    #[test]
    fn manual_requires_located_in_host() {
        let mut c = container("web", None);
        let mut containers = HashMap::new();
        containers.insert(c.name.clone(), c.clone());
        assert!(plan_manual(&containers).is_err());

        c.located_in_host = Some("host-1".to_string());
        containers.insert(c.name.clone(), c);
        assert_eq!(plan_manual(&containers).unwrap().get("web"), Some(&"host-1".to_string()));
    }

    #[test]
    fn spread_balances_across_hosts() {
        let mut containers = HashMap::new();
        containers.insert("a".to_string(), container("a", Some(100)));
        containers.insert("b".to_string(), container("b", Some(100)));
        let hosts = vec![host("h1", 4096, 0), host("h2", 4096, 0)];
        let map = plan_spread(&containers, &hosts).unwrap();
        let mut used: Vec<&String> = map.values().collect();
        used.sort();
        assert_eq!(used, vec![&"h1".to_string(), &"h2".to_string()]);
    }

    #[test]
    fn auto_rejects_when_no_host_meets_memory_floor() {
        let mut containers = HashMap::new();
        containers.insert("big".to_string(), container("big", Some(100_000)));
        let hosts = vec![host("h1", 4096, 0)];
        assert!(matches!(
            plan_auto(&containers, &hosts),
            Err(GraphiumError::PlacementUnsatisfiable(_))
        ));
    }
}
