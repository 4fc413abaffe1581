//! Core domain services: the Task Queue, Agent Runtime, Stack Orchestrator,
//! Workflow Executor, and the Agent Process Supervisor.

pub mod agent_runtime;
pub mod orchestrator;
pub mod supervisor;
pub mod task_queue_service;
pub mod workflow;

pub use orchestrator::StackOrchestrator;
pub use supervisor::Supervisor;
pub use task_queue_service::TaskQueueService;
pub use workflow::WorkflowExecutor;
