//! Runtime port - abstract capability set for a single container host.
//!
//! A `Runtime` is the underlying container engine an agent drives (Docker,
//! Podman, or any compatible socket). Implementations live under
//! `adapters::runtimes`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{ContainerSpec, PullPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    #[serde(default)]
    pub ports: HashMap<u16, u16>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecOptions {
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogOptions {
    #[serde(default)]
    pub follow: bool,
    #[serde(default)]
    pub tail: Option<usize>,
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub timestamps: bool,
}

/// Capability set a single container host exposes to the agent loop. Every
/// method is async and cancellation-safe: a dropped future must not leave
/// the underlying engine in a half-applied state beyond what the engine
/// itself guarantees.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Engine identifier, e.g. `"docker"`, `"podman"`.
    fn name(&self) -> &'static str;

    /// Pull `image` according to `policy`. A no-op when the policy is
    /// `never` or the image is already present and the policy is
    /// `if-not-present`.
    async fn pull(&self, image: &str, policy: PullPolicy) -> GraphiumResult<()>;

    /// Create (but do not start) a container from `spec`, returning its id.
    async fn create(&self, spec: &ContainerSpec) -> GraphiumResult<String>;

    async fn start(&self, container_id: &str) -> GraphiumResult<()>;

    /// Stop with a grace period before a forced kill.
    async fn stop(&self, container_id: &str, timeout_seconds: u64) -> GraphiumResult<()>;

    async fn restart(&self, container_id: &str, timeout_seconds: u64) -> GraphiumResult<()>;

    async fn remove(&self, container_id: &str, remove_volumes: bool, force: bool) -> GraphiumResult<()>;

    async fn inspect(&self, container_id: &str) -> GraphiumResult<ContainerInfo>;

    async fn logs(&self, container_id: &str, options: &LogOptions) -> GraphiumResult<Vec<u8>>;

    async fn exec(&self, container_id: &str, argv: &[String], options: &ExecOptions) -> GraphiumResult<ExecResult>;

    async fn list(&self) -> GraphiumResult<Vec<ContainerInfo>>;

    /// Liveness probe for the engine connection itself, independent of any container.
    async fn ping(&self) -> GraphiumResult<()>;

    /// Create the network named by `name` if it doesn't already exist, in
    /// the mode the stack declares (bridge/overlay per `NetworkMode`).
    async fn ensure_network(&self, name: &str, overlay: bool) -> GraphiumResult<()>;
}
