//! `delete` handler: optionally stop, then remove.

use crate::domain::errors::GraphiumResult;
use crate::domain::models::DeletePayload;

use super::HandlerContext;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let delete: DeletePayload = serde_json::from_value(payload.clone())?;
    let stop_timeout = delete.stop_timeout.unwrap_or(10);

    let _ = ctx.runtime.stop(&delete.container_id, stop_timeout).await;
    ctx.runtime
        .remove(&delete.container_id, delete.remove_volumes, delete.force)
        .await?;

    Ok(serde_json::json!({ "container_id": delete.container_id, "removed": true }))
}
