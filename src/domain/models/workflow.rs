//! Workflow Executor domain types: composite actions of ordered steps with
//! cross-step output substitution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// A single step of a composite action. `action_type` names a task kind
/// from the domain's task-kind table (`deploy`, `check`, …) or one of the
/// two placeholder kinds (`deploy-stack`, `wait`); `params` is the
/// kind-specific opaque payload before substitution is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, rename = "outputAs")]
    pub output_as: Option<String>,
    #[serde(flatten)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeAction {
    pub composite_action: bool,
    pub execution_mode: ExecutionMode,
    pub actions: Vec<WorkflowStep>,
}

/// Result of running a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub action_type: String,
    pub succeeded: bool,
    /// Result data map the step produced; scoped for later `outputAs` lookup.
    pub data: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a whole composite invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResult {
    pub succeeded: bool,
    pub step_results: Vec<StepResult>,
    #[serde(default)]
    pub failed_step: Option<usize>,
}

/// Outputs map scoped to a single composite invocation: step name
/// (`outputAs`) -> that step's result data.
pub type OutputsMap = HashMap<String, serde_json::Value>;
