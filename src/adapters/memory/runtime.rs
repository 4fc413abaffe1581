//! Pure in-memory `Runtime` fake. Used by unit and integration tests that
//! exercise the agent poll loop and orchestrator without a real container
//! engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{ContainerSpec, PullPolicy};
use crate::domain::ports::{ContainerInfo, ExecOptions, ExecResult, LogOptions, Runtime};

struct FakeContainer {
    info: ContainerInfo,
    logs: Vec<u8>,
}

#[derive(Default)]
pub struct FakeRuntime {
    containers: RwLock<HashMap<String, FakeContainer>>,
    networks: RwLock<Vec<String>>,
    next_id: std::sync::atomic::AtomicU64,
    /// When set, `exec` returns this exit code instead of 0.
    pub forced_exec_exit_code: Option<i32>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: append raw bytes to a container's captured log buffer, as
    /// if the engine had just written a new framed chunk.
    pub fn push_logs(&self, container_id: &str, bytes: &[u8]) {
        if let Some(container) = self.containers.write().expect("lock poisoned").get_mut(container_id) {
            container.logs.extend_from_slice(bytes);
        }
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn pull(&self, _image: &str, _policy: PullPolicy) -> GraphiumResult<()> {
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> GraphiumResult<String> {
        let id = format!(
            "fake-{}",
            self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        );
        let info = ContainerInfo {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            state: "created".to_string(),
            status: "created".to_string(),
            ports: spec.ports.clone(),
            labels: HashMap::new(),
        };
        self.containers
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), FakeContainer { info, logs: Vec::new() });
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> GraphiumResult<()> {
        let mut guard = self.containers.write().expect("lock poisoned");
        let container = guard
            .get_mut(container_id)
            .ok_or_else(|| GraphiumError::ExecutionFailed(format!("no such container: {container_id}")))?;
        container.info.state = "running".to_string();
        container.info.status = "Up".to_string();
        Ok(())
    }

    async fn stop(&self, container_id: &str, _timeout_seconds: u64) -> GraphiumResult<()> {
        let mut guard = self.containers.write().expect("lock poisoned");
        let container = guard
            .get_mut(container_id)
            .ok_or_else(|| GraphiumError::ExecutionFailed(format!("no such container: {container_id}")))?;
        container.info.state = "exited".to_string();
        container.info.status = "Exited (0)".to_string();
        Ok(())
    }

    async fn restart(&self, container_id: &str, timeout_seconds: u64) -> GraphiumResult<()> {
        self.stop(container_id, timeout_seconds).await?;
        self.start(container_id).await
    }

    async fn remove(&self, container_id: &str, _remove_volumes: bool, _force: bool) -> GraphiumResult<()> {
        self.containers.write().expect("lock poisoned").remove(container_id);
        Ok(())
    }

    async fn inspect(&self, container_id: &str) -> GraphiumResult<ContainerInfo> {
        self.containers
            .read()
            .expect("lock poisoned")
            .get(container_id)
            .map(|c| c.info.clone())
            .ok_or_else(|| GraphiumError::ExecutionFailed(format!("no such container: {container_id}")))
    }

    async fn logs(&self, container_id: &str, _options: &LogOptions) -> GraphiumResult<Vec<u8>> {
        self.containers
            .read()
            .expect("lock poisoned")
            .get(container_id)
            .map(|c| c.logs.clone())
            .ok_or_else(|| GraphiumError::ExecutionFailed(format!("no such container: {container_id}")))
    }

    async fn exec(&self, container_id: &str, argv: &[String], _options: &ExecOptions) -> GraphiumResult<ExecResult> {
        if !self.containers.read().expect("lock poisoned").contains_key(container_id) {
            return Err(GraphiumError::ExecutionFailed(format!("no such container: {container_id}")));
        }
        Ok(ExecResult {
            stdout: format!("ran: {}", argv.join(" ")).into_bytes(),
            stderr: Vec::new(),
            exit_code: self.forced_exec_exit_code.unwrap_or(0),
        })
    }

    async fn list(&self) -> GraphiumResult<Vec<ContainerInfo>> {
        Ok(self
            .containers
            .read()
            .expect("lock poisoned")
            .values()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn ping(&self) -> GraphiumResult<()> {
        Ok(())
    }

    async fn ensure_network(&self, name: &str, _overlay: bool) -> GraphiumResult<()> {
        let mut guard = self.networks.write().expect("lock poisoned");
        if !guard.iter().any(|n| n == name) {
            guard.push(name.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn spec(name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: "alpine:latest".to_string(),
            env: Map::new(),
            ports: Map::new(),
            mounts: Vec::new(),
            healthcheck: None,
            resources: Default::default(),
            depends_on: Vec::new(),
            located_in_host: None,
            restart_policy: None,
        }
    }

    #[tokio::test]
    async fn create_start_inspect_round_trip() {
        let runtime = FakeRuntime::new();
        let id = runtime.create(&spec("web")).await.unwrap();
        runtime.start(&id).await.unwrap();
        let info = runtime.inspect(&id).await.unwrap();
        assert_eq!(info.state, "running");
    }

    #[tokio::test]
    async fn exec_reports_forced_exit_code() {
        let mut runtime = FakeRuntime::new();
        runtime.forced_exec_exit_code = Some(1);
        let id = runtime.create(&spec("web")).await.unwrap();
        let result = runtime
            .exec(&id, &["true".to_string()], &ExecOptions::default())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 1);
    }
}
