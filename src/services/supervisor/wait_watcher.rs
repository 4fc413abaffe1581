//! Wait watcher: awaits child exit and is the sole transition authority
//! after `StartAgent` succeeds. `StopAgent` coordinates with it only via
//! the interrupt signal, never by mutating state directly, and learns of
//! the transition through `ProcessHandle::transitioned`.

use std::sync::Arc;

use tracing::info;

use crate::domain::models::ProcessStatus;

use super::{ProcessHandle, Supervisor};

pub async fn watch(_supervisor: Arc<Supervisor>, host_id: String, handle: Arc<ProcessHandle>) {
    let wait_result = {
        let mut guard = handle.entry.lock().await;
        match guard.child.take() {
            Some(mut child) => {
                // Drop the lock while awaiting exit: the supervisor must
                // never hold a process-map mutex across a suspending wait.
                drop(guard);
                let result = child.wait().await;
                guard = handle.entry.lock().await;
                guard.child = None;
                result
            }
            None => return,
        }
    };

    let mut guard = handle.entry.lock().await;
    // StopAgent may have already transitioned this entry to `stopped` via
    // the interrupt-signal path; only overwrite if still live.
    if !guard.state.status.is_terminal() {
        match wait_result {
            Ok(status) if status.success() => {
                guard.state.status = ProcessStatus::Stopped;
                info!(host_id = %host_id, "agent exited cleanly");
            }
            Ok(status) => {
                guard.state.status = ProcessStatus::Failed;
                guard.state.error_message = Some(format!("agent exited with {status}"));
            }
            Err(e) => {
                guard.state.status = ProcessStatus::Failed;
                guard.state.error_message = Some(format!("failed to wait on agent process: {e}"));
            }
        }
        guard.state.stopped_at = Some(chrono::Utc::now());
    }
    drop(guard);
    handle.transitioned.notify_one();
}
