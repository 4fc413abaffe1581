//! Periodic liveness probe for every tracked process in `running`: a null
//! signal (POSIX signal 0). On error, the process is presumed dead and
//! transitioned to `failed`.

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::warn;

use crate::domain::models::ProcessStatus;

use super::Supervisor;

pub async fn run(supervisor: Arc<Supervisor>, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => tick(&supervisor).await,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn tick(supervisor: &Supervisor) {
    let handles: Vec<_> = supervisor.processes.read().await.values().cloned().collect();
    for handle in handles {
        let mut guard = handle.entry.lock().await;
        if guard.state.status != ProcessStatus::Running {
            continue;
        }
        let Some(pid) = guard.state.process_id else {
            continue;
        };

        // Signal 0 performs no actual signal delivery, only error checking.
        let died = kill(Pid::from_raw(pid), None).is_err();
        if died {
            warn!(host_id = %guard.state.config_id, pid, "process died unexpectedly");
            guard.state.status = ProcessStatus::Failed;
            guard.state.error_message = Some("Process died unexpectedly".to_string());
            guard.state.stopped_at = Some(chrono::Utc::now());
        }
        drop(guard);
        if died {
            handle.transitioned.notify_one();
        }
    }
}
