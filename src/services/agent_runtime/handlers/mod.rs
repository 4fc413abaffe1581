//! Handler table shared between the Agent Runtime poll loop and the
//! Workflow Executor: every handler is a pure function of `(ctx, payload) ->
//! (result, error)` and never panics across the loop boundary.

pub mod check;
pub mod control;
pub mod delete;
pub mod deploy;
pub mod exec;
pub mod lifecycle;
pub mod transfer;

use std::sync::Arc;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::TaskKind;
use crate::domain::ports::Runtime;

/// Shared dependencies a handler needs: the local container runtime and the
/// destination directory `transfer` writes collected logs to.
#[derive(Clone)]
pub struct HandlerContext {
    pub runtime: Arc<dyn Runtime>,
    pub log_collection_dir: std::path::PathBuf,
}

/// Dispatch `kind` against `payload`, returning the task's result-data value
/// on success. `workflow` is not dispatched here — it is handled one layer
/// up by the poll loop, which hands off to the Workflow Executor.
pub async fn dispatch(ctx: &HandlerContext, kind: TaskKind, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    match kind {
        TaskKind::Deploy => deploy::handle(ctx, payload).await,
        TaskKind::Delete => delete::handle(ctx, payload).await,
        TaskKind::Stop => lifecycle::handle_stop(ctx, payload).await,
        TaskKind::Start => lifecycle::handle_start(ctx, payload).await,
        TaskKind::Restart => lifecycle::handle_restart(ctx, payload).await,
        TaskKind::Control => control::handle(ctx, payload).await,
        TaskKind::Check => check::handle(ctx, payload).await,
        TaskKind::Transfer => transfer::handle(ctx, payload).await,
        TaskKind::ContainerExec => exec::handle(ctx, payload).await,
        TaskKind::Workflow => Err(GraphiumError::Validation(
            "workflow tasks are dispatched by the poll loop, not the handler table".to_string(),
        )),
    }
}
