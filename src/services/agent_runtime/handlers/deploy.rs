//! `deploy` handler: ensure the image is present, create the container with
//! the full spec, and start it.

use crate::domain::errors::GraphiumResult;
use crate::domain::models::{ContainerSpec, DeployPayload};

use super::HandlerContext;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let deploy: DeployPayload = serde_json::from_value(payload.clone())?;

    ctx.runtime.pull(&deploy.image, deploy.pull_policy).await?;

    let spec = ContainerSpec {
        name: deploy.container_name.clone().unwrap_or_else(|| deploy.image.clone()),
        image: deploy.image,
        env: deploy.env,
        ports: deploy.ports,
        mounts: deploy.mounts,
        healthcheck: deploy.healthcheck.map(|h| crate::domain::models::PlanHealthcheckSpec {
            test: h.test,
            interval_seconds: h.interval_seconds,
            timeout_seconds: h.timeout_seconds,
            retries: h.retries,
        }),
        resources: crate::domain::models::ResourceConstraints {
            min_cpu: deploy.resources.min_cpu,
            min_memory_mb: deploy.resources.min_memory_mb,
            labels: deploy.labels,
        },
        depends_on: Vec::new(),
        located_in_host: None,
        restart_policy: deploy.restart_policy,
    };

    let container_id = ctx.runtime.create(&spec).await?;
    ctx.runtime.start(&container_id).await?;

    Ok(serde_json::json!({ "container_id": container_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::FakeRuntime;
    use std::sync::Arc;

    #[tokio::test]
    async fn deploy_creates_and_starts_container() {
        let ctx = HandlerContext {
            runtime: Arc::new(FakeRuntime::new()),
            log_collection_dir: std::env::temp_dir(),
        };
        let payload = serde_json::json!({
            "image": "alpine:latest",
            "pull_policy": "if-not-present",
        });
        let result = handle(&ctx, &payload).await.unwrap();
        assert!(result.get("container_id").is_some());
    }
}
