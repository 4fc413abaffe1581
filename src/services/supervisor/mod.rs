//! Agent Process Supervisor (§4.1): maintains one child process per enabled
//! `AgentConfig`, with crash detection and clean teardown.

pub mod health_tick;
pub mod wait_watcher;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{info, instrument, warn};

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{AgentConfig, AgentProcessState, ProcessStatus};
use crate::domain::ports::{ListFilter, Store, TokenIssuer};

const HEALTH_TICK_INTERVAL: Duration = Duration::from_secs(30);
const STOP_GRACE: Duration = Duration::from_secs(10);
const RESTART_SLEEP: Duration = Duration::from_millis(500);
const TOKEN_VALIDITY_SECONDS: i64 = 365 * 24 * 60 * 60;

struct ProcessEntry {
    state: AgentProcessState,
    child: Option<Child>,
}

/// A tracked process plus the notification `wait_watcher` fires on every
/// state transition. `StopAgent` never writes a terminal status itself; it
/// only signals and then waits on `transitioned` for the watcher to do so.
struct ProcessHandle {
    entry: Mutex<ProcessEntry>,
    transitioned: Notify,
}

/// Holds the coarse RW-mutex over the process map; per-agent mutations
/// further serialize under each entry's own mutex. Start/Stop/Restart never
/// hold the map lock across an await on the child process or the Store.
pub struct Supervisor {
    config_store: Arc<dyn Store<AgentConfig>>,
    token_issuer: Arc<dyn TokenIssuer>,
    processes: RwLock<HashMap<String, Arc<ProcessHandle>>>,
    logs_dir: PathBuf,
    agent_binary_path: String,
    api_url: String,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(
        config_store: Arc<dyn Store<AgentConfig>>,
        token_issuer: Arc<dyn TokenIssuer>,
        logs_dir: PathBuf,
        agent_binary_path: String,
        api_url: String,
    ) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            config_store,
            token_issuer,
            processes: RwLock::new(HashMap::new()),
            logs_dir,
            agent_binary_path,
            api_url,
            shutdown,
        }
    }

    /// Load all AgentConfigs; start each enabled with `auto_start`; launch
    /// the periodic health tick.
    #[instrument(skip(self))]
    pub async fn start(self: &Arc<Self>) -> GraphiumResult<()> {
        let configs = self.config_store.list(&ListFilter::new()).await?;
        for config in configs {
            if config.enabled && config.auto_start {
                if let Err(e) = self.start_agent(&config.host_id).await {
                    warn!(host_id = %config.host_id, error = %e, "failed to auto-start agent");
                }
            }
        }

        let supervisor = self.clone();
        let shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            health_tick::run(supervisor, HEALTH_TICK_INTERVAL, shutdown_rx).await;
        });

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn start_agent(self: &Arc<Self>, host_id: &str) -> GraphiumResult<()> {
        {
            let map = self.processes.read().await;
            if let Some(handle) = map.get(host_id) {
                let guard = handle.entry.lock().await;
                if guard.state.status == ProcessStatus::Running {
                    return Err(GraphiumError::InvalidStateTransition {
                        from: "running".to_string(),
                        to: "starting".to_string(),
                    });
                }
            }
        }

        let Some(config) = self.config_store.get(host_id).await? else {
            return Err(GraphiumError::AgentNotFound(host_id.to_string()));
        };

        let token = self.token_issuer.mint(host_id, TOKEN_VALIDITY_SECONDS).await?;

        tokio::fs::create_dir_all(&self.logs_dir)
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to create logs dir: {e}")))?;
        let log_path = self.logs_dir.join(format!("{host_id}.log"));
        let log_file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to open {}: {e}", log_path.display())))?;
        let log_file_stderr = log_file
            .try_clone()
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?;

        let mut command = Command::new(&self.agent_binary_path);
        command
            .arg("--api-url")
            .arg(&self.api_url)
            .arg("--host-id")
            .arg(host_id)
            .arg("--runtime-endpoint")
            .arg(&config.runtime_endpoint)
            .env("TOKEN", &token)
            .stdout(log_file.into_std().await)
            .stderr(log_file_stderr.into_std().await);
        if let Some(dc) = &config.datacenter {
            command.arg("--datacenter").arg(dc);
        }
        if let Some(key_path) = &config.key_path {
            command.env("KEY_PATH", key_path);
        }

        let child = command
            .spawn()
            .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to spawn agent process: {e}")))?;
        let pid = child.id().map(|p| p as i32);

        let mut state = AgentProcessState::stopped(host_id);
        state.status = ProcessStatus::Running;
        state.started_at = Some(chrono::Utc::now());
        state.process_id = pid;
        state.bearer_token_fingerprint = Some(fingerprint(&token));

        let handle = Arc::new(ProcessHandle { entry: Mutex::new(ProcessEntry { state, child: Some(child) }), transitioned: Notify::new() });
        self.processes.write().await.insert(host_id.to_string(), handle.clone());

        let supervisor = self.clone();
        let host_id_owned = host_id.to_string();
        tokio::spawn(async move {
            wait_watcher::watch(supervisor, host_id_owned, handle).await;
        });

        info!(host_id = %host_id, pid = ?pid, "agent started");
        Ok(())
    }

    /// Signal the process and wait for `wait_watcher` to observe its exit.
    /// Never writes `Stopped`/`Failed` itself — `wait_watcher::watch` is the
    /// sole authority over that transition; this only sends signals and
    /// marks the in-between `Stopping` status so readers see intent.
    #[instrument(skip(self))]
    pub async fn stop_agent(&self, host_id: &str) -> GraphiumResult<()> {
        let handle = {
            let map = self.processes.read().await;
            map.get(host_id).cloned()
        };
        let Some(handle) = handle else {
            return Ok(());
        };

        let pid = {
            let mut guard = handle.entry.lock().await;
            if guard.state.status.is_terminal() {
                return Ok(());
            }
            guard.state.status = ProcessStatus::Stopping;
            guard.state.process_id
        };

        let Some(pid) = pid else {
            // No pid recorded means the watcher already reaped the child and
            // is about to (or just did) write the terminal status itself.
            self.await_transition(&handle, STOP_GRACE).await;
            return Ok(());
        };

        let _ = signal::kill(Pid::from_raw(pid), Signal::SIGINT);
        if self.await_transition(&handle, STOP_GRACE).await {
            return Ok(());
        }

        let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
        // Leave the final write to the watcher; it will observe the forced
        // exit via `child.wait()` and record `Failed` once the kernel reaps
        // the process, however long that takes.
        self.await_transition(&handle, STOP_GRACE).await;
        Ok(())
    }

    /// Wait up to `timeout` for `handle`'s status to become terminal,
    /// without ever writing it. Returns whether it did.
    async fn await_transition(&self, handle: &Arc<ProcessHandle>, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let guard = handle.entry.lock().await;
                if guard.state.status.is_terminal() {
                    return true;
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let _ = tokio::time::timeout(remaining, handle.transitioned.notified()).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn restart_agent(self: &Arc<Self>, host_id: &str) -> GraphiumResult<()> {
        self.stop_agent(host_id).await?;
        tokio::time::sleep(RESTART_SLEEP).await;
        self.start_agent(host_id).await
    }

    pub async fn get_agent_state(&self, host_id: &str) -> GraphiumResult<AgentProcessState> {
        let map = self.processes.read().await;
        match map.get(host_id) {
            Some(handle) => Ok(handle.entry.lock().await.state.clone()),
            None => Ok(AgentProcessState::stopped(host_id)),
        }
    }

    pub async fn list_agent_states(&self) -> Vec<AgentProcessState> {
        let map = self.processes.read().await;
        let mut states = Vec::with_capacity(map.len());
        for handle in map.values() {
            states.push(handle.entry.lock().await.state.clone());
        }
        states
    }

    /// Cancel the supervisor context: stop every tracked agent.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> GraphiumResult<()> {
        let _ = self.shutdown.send(true);
        let host_ids: Vec<String> = self.processes.read().await.keys().cloned().collect();
        for host_id in host_ids {
            self.stop_agent(&host_id).await?;
        }
        Ok(())
    }
}

fn fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
