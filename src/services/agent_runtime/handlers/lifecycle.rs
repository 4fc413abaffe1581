//! `stop` / `start` / `restart` handlers: invoke the Runtime with a timeout
//! (default 10 s).

use crate::domain::errors::GraphiumResult;
use crate::domain::models::LifecyclePayload;

use super::HandlerContext;

const DEFAULT_TIMEOUT: u64 = 10;

pub async fn handle_stop(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let p: LifecyclePayload = serde_json::from_value(payload.clone())?;
    ctx.runtime.stop(&p.container_id, p.timeout.unwrap_or(DEFAULT_TIMEOUT)).await?;
    Ok(serde_json::json!({ "container_id": p.container_id, "status": "stopped" }))
}

pub async fn handle_start(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let p: LifecyclePayload = serde_json::from_value(payload.clone())?;
    ctx.runtime.start(&p.container_id).await?;
    Ok(serde_json::json!({ "container_id": p.container_id, "status": "started" }))
}

pub async fn handle_restart(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let p: LifecyclePayload = serde_json::from_value(payload.clone())?;
    ctx.runtime
        .restart(&p.container_id, p.timeout.unwrap_or(DEFAULT_TIMEOUT))
        .await?;
    Ok(serde_json::json!({ "container_id": p.container_id, "status": "restarted" }))
}
