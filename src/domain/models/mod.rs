pub mod agent;
pub mod agent_config;
pub mod agent_process_state;
pub mod deployment_plan;
pub mod deployment_state;
pub mod ignore_entry;
pub mod stack;
pub mod task;
pub mod workflow;

pub use agent::{Agent, TokenClaims};
pub use agent_config::AgentConfig;
pub use agent_process_state::{AgentProcessState, ProcessStatus};
pub use deployment_plan::{
    ContainerSpec, DeploymentPlan, HealthcheckSpec as PlanHealthcheckSpec, HostCandidate, NetworkSpec,
    ResourceConstraints, Wave,
};
pub use deployment_state::{
    DeploymentEvent, DeploymentEventKind, DeploymentState, Placement, PlacementStatus, RollbackState,
};
pub use ignore_entry::IgnoreEntry;
pub use stack::{DeploymentConfig, DeploymentMode, NetworkMode, PlacementStrategy, Stack, StackStatus};
pub use task::{
    CheckPayload, CheckType, ContainerExecPayload, ControlAction, ControlPayload, DeletePayload, DeployPayload,
    ExecCommand, HealthcheckSpec, LifecyclePayload, PullPolicy, ResourceSpec, Task, TaskKind, TaskStatus,
    TransferPayload,
};
pub use workflow::{CompositeAction, CompositeResult, ExecutionMode, OutputsMap, StepResult, WorkflowStep};
