//! Domain errors for the Graphium control plane.

use thiserror::Error;

/// Coarse classification used to decide retry behaviour and HTTP status
/// mapping (see `ErrorKind::http_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed payload, missing required field, unsupported kind. Never retried.
    Validation,
    /// Network timeout, runtime endpoint unavailable, store revision conflict.
    /// Retried with exponential backoff, bounded by `max_retries`.
    Transient,
    /// Image pull denied, placement unsatisfiable, cyclic dependency, task
    /// timeout exhausted. Surfaced to caller; never retried automatically.
    Permanent,
    /// Invariant violation. Should not occur in correct code.
    Programmer,
}

impl ErrorKind {
    /// HTTP status code a router should map this error kind to.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Transient => 503,
            Self::Permanent => 500,
            Self::Programmer => 500,
        }
    }
}

/// Domain-level errors that can occur anywhere in the Graphium system.
#[derive(Debug, Error)]
pub enum GraphiumError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("stack not found: {0}")]
    StackNotFound(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("dependency cycle detected: {0:?}")]
    DependencyCycle(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("optimistic concurrency conflict: {entity} {id} was modified")]
    Conflict { entity: String, id: String },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("placement unsatisfiable: {0}")]
    PlacementUnsatisfiable(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type GraphiumResult<T> = Result<T, GraphiumError>;

impl GraphiumError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::AgentNotFound(_) | Self::StackNotFound(_) => {
                ErrorKind::Validation
            }
            Self::Transient(_) => ErrorKind::Transient,
            Self::Conflict { .. } => ErrorKind::Transient,
            Self::DependencyCycle(_)
            | Self::PlacementUnsatisfiable(_)
            | Self::ExecutionFailed(_)
            | Self::NotImplemented(_) => ErrorKind::Permanent,
            Self::Unauthorized(_) => ErrorKind::Validation,
            Self::InvalidStateTransition { .. } => ErrorKind::Programmer,
            Self::Database(_) | Self::Serialization(_) => ErrorKind::Permanent,
        }
    }
}

impl From<sqlx::Error> for GraphiumError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for GraphiumError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
