//! Workflow Executor: runs a composite action's steps in order, applying
//! variable substitution before each step and recording outputs for
//! subsequent steps to reference (§4.5).

use tracing::{info, instrument, warn};

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{CompositeAction, CompositeResult, ExecutionMode, OutputsMap, StepResult, TaskKind};
use crate::services::agent_runtime::handlers::{self, HandlerContext};

use super::substitution::substitute;

pub struct WorkflowExecutor {
    ctx: HandlerContext,
}

impl WorkflowExecutor {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, action))]
    pub async fn run(&self, action: &CompositeAction) -> GraphiumResult<CompositeResult> {
        if action.execution_mode != ExecutionMode::Sequential {
            return Err(GraphiumError::NotImplemented(
                "parallel execution_mode is not supported".to_string(),
            ));
        }

        let mut outputs: OutputsMap = OutputsMap::new();
        let mut step_results = Vec::with_capacity(action.actions.len());

        for (index, step) in action.actions.iter().enumerate() {
            let substituted_params = substitute(&step.params, &outputs);
            let step_result = self.run_step(&step.action_type, &substituted_params).await;

            let succeeded = step_result.is_ok();
            let (data, error) = match step_result {
                Ok(data) => (data, None),
                Err(e) => (serde_json::Value::Null, Some(e.to_string())),
            };

            if succeeded {
                if let Some(output_as) = &step.output_as {
                    outputs.insert(output_as.clone(), data.clone());
                }
            }

            step_results.push(StepResult {
                action_type: step.action_type.clone(),
                succeeded,
                data,
                error,
            });

            if !succeeded {
                warn!(step = index, action_type = %step.action_type, "composite step failed, aborting");
                return Ok(CompositeResult {
                    succeeded: false,
                    step_results,
                    failed_step: Some(index),
                });
            }
        }

        info!(step_count = step_results.len(), "composite action completed");
        Ok(CompositeResult {
            succeeded: true,
            step_results,
            failed_step: None,
        })
    }

    async fn run_step(&self, action_type: &str, params: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
        match action_type {
            "deploy-stack" | "wait" => Err(GraphiumError::NotImplemented(format!(
                "workflow step kind '{action_type}' is not implemented"
            ))),
            other => {
                let kind = TaskKind::from_str(other)
                    .ok_or_else(|| GraphiumError::Validation(format!("unknown workflow step kind: {other}")))?;
                handlers::dispatch(&self.ctx, kind, params).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::FakeRuntime;
    use crate::domain::models::WorkflowStep;
    use std::sync::Arc;

    fn executor() -> WorkflowExecutor {
        WorkflowExecutor::new(HandlerContext {
            runtime: Arc::new(FakeRuntime::new()),
            log_collection_dir: std::env::temp_dir(),
        })
    }

    #[tokio::test]
    async fn deploy_output_feeds_subsequent_step() {
        let exec = executor();
        let action = CompositeAction {
            composite_action: true,
            execution_mode: ExecutionMode::Sequential,
            actions: vec![
                WorkflowStep {
                    action_type: "deploy".to_string(),
                    output_as: Some("web".to_string()),
                    params: serde_json::json!({"image": "alpine:latest"}),
                },
                WorkflowStep {
                    action_type: "container-exec".to_string(),
                    output_as: None,
                    params: serde_json::json!({
                        "container_id": "${{web.container_id}}",
                        "command": ["echo", "hi"],
                    }),
                },
            ],
        };

        let result = exec.run(&action).await.unwrap();
        assert!(result.succeeded);
        assert_eq!(result.step_results.len(), 2);
    }

    #[tokio::test]
    async fn first_failed_step_aborts_remaining_steps() {
        let exec = executor();
        let action = CompositeAction {
            composite_action: true,
            execution_mode: ExecutionMode::Sequential,
            actions: vec![
                WorkflowStep {
                    action_type: "stop".to_string(),
                    output_as: None,
                    params: serde_json::json!({"container_id": "does-not-exist"}),
                },
                WorkflowStep {
                    action_type: "deploy".to_string(),
                    output_as: None,
                    params: serde_json::json!({"image": "alpine:latest"}),
                },
            ],
        };

        let result = exec.run(&action).await.unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.failed_step, Some(0));
        assert_eq!(result.step_results.len(), 1);
    }

    #[tokio::test]
    async fn placeholder_steps_report_not_implemented() {
        let exec = executor();
        let action = CompositeAction {
            composite_action: true,
            execution_mode: ExecutionMode::Sequential,
            actions: vec![WorkflowStep {
                action_type: "wait".to_string(),
                output_as: None,
                params: serde_json::json!({}),
            }],
        };
        let result = exec.run(&action).await.unwrap();
        assert!(!result.succeeded);
    }
}
