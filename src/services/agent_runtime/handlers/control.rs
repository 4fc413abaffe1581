//! `control` handler: dispatch on `action`; `pause`/`unpause` collapse to
//! `stop`/`start` since the Runtime port has no native pause primitive.

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{ControlAction, ControlPayload};

use super::HandlerContext;

const DEFAULT_TIMEOUT: u64 = 10;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let p: ControlPayload = serde_json::from_value(payload.clone())?;

    match p.action {
        ControlAction::Start | ControlAction::Unpause => {
            ctx.runtime.start(&p.container_id).await?;
        }
        ControlAction::Stop | ControlAction::Pause => {
            ctx.runtime.stop(&p.container_id, DEFAULT_TIMEOUT).await?;
        }
        ControlAction::Restart => {
            ctx.runtime.restart(&p.container_id, DEFAULT_TIMEOUT).await?;
        }
    }

    Ok(serde_json::json!({ "container_id": p.container_id, "action": p.action }))
}
