//! `transfer` (`collect-logs`) handler: read container logs and write them
//! to a local file with restrictive permissions.

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tokio::io::AsyncWriteExt;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::TransferPayload;
use crate::domain::ports::LogOptions;

use super::HandlerContext;

const DEFAULT_LINES: usize = 100;
const DIR_MODE: u32 = 0o750;
const FILE_MODE: u32 = 0o600;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let transfer: TransferPayload = serde_json::from_value(payload.clone())?;
    let lines = transfer.lines.unwrap_or(DEFAULT_LINES);

    let log_options = LogOptions {
        follow: false,
        tail: Some(lines),
        since: transfer.since,
        timestamps: false,
    };
    let raw = ctx.runtime.logs(&transfer.container_id, &log_options).await?;

    let dest_dir = std::path::PathBuf::from(&transfer.destination);
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to create {}: {e}", dest_dir.display())))?;
    #[cfg(unix)]
    {
        let mut perms = tokio::fs::metadata(&dest_dir)
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?
            .permissions();
        perms.set_mode(DIR_MODE);
        tokio::fs::set_permissions(&dest_dir, perms)
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?;
    }

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let file_name = format!("{}-{}.log", transfer.container_id, timestamp);
    let file_path = dest_dir.join(&file_name);

    let mut file = tokio::fs::File::create(&file_path)
        .await
        .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to create {}: {e}", file_path.display())))?;
    file.write_all(&raw)
        .await
        .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?;

    #[cfg(unix)]
    {
        let mut perms = file
            .metadata()
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?
            .permissions();
        perms.set_mode(FILE_MODE);
        tokio::fs::set_permissions(&file_path, perms)
            .await
            .map_err(|e| GraphiumError::ExecutionFailed(e.to_string()))?;
    }

    let byte_count = raw.len();
    let line_count = raw.iter().filter(|&&b| b == b'\n').count();

    Ok(serde_json::json!({
        "path": file_path.to_string_lossy(),
        "byte_count": byte_count,
        "line_count": line_count,
    }))
}
