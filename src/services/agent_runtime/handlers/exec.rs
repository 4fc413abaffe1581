//! `container-exec` handler: run a command inside a running container and
//! report its exit code.

use crate::domain::errors::GraphiumResult;
use crate::domain::models::ContainerExecPayload;
use crate::domain::ports::ExecOptions;

use super::HandlerContext;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let exec: ContainerExecPayload = serde_json::from_value(payload.clone())?;
    let argv = exec.command.to_argv();

    let options = ExecOptions {
        env: exec.env,
        working_dir: exec.working_dir,
        user: exec.user,
    };

    let result = ctx.runtime.exec(&exec.container_id, &argv, &options).await?;

    Ok(serde_json::json!({
        "exit_code": result.exit_code,
        "succeeded": result.exit_code == 0,
        "stdout": String::from_utf8_lossy(&result.stdout),
        "stderr": String::from_utf8_lossy(&result.stderr),
    }))
}
