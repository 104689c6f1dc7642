use std::sync::PoisonError;

use thiserror::Error;

use crate::types::TaskStatus;
use crate::Id;

/// Errors surfaced by the coordinator and its components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Malformed agent or task input. Rejected synchronously.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid construction parameters. The coordinator cannot start.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A shared resource became unusable (poisoned lock, missing runtime).
    #[error("Concurrency failure: {0}")]
    Concurrency(String),

    /// The operation is only valid while the tick is stopped.
    #[error("Coordinator is running; pause it first")]
    Running,
}

impl CoordinatorError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl<T> From<PoisonError<T>> for CoordinatorError {
    fn from(err: PoisonError<T>) -> Self {
        Self::Concurrency(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Result of trying to allocate one task.
///
/// `Deferred` is informational: the task stays `Pending` and is retried on the
/// next tick or explicit call.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationOutcome {
    /// The task moved to `Assigned`.
    Assigned {
        task_id: Id,
        agent_id: Id,
        score: f64,
    },
    /// No agent is currently available.
    Deferred { task_id: Id },
    /// The task was not `Pending`; nothing changed.
    Unchanged { task_id: Id, status: TaskStatus },
}

impl AllocationOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            AllocationOutcome::Assigned { task_id, .. }
            | AllocationOutcome::Deferred { task_id }
            | AllocationOutcome::Unchanged { task_id, .. } => task_id,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, AllocationOutcome::Assigned { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, AllocationOutcome::Deferred { .. })
    }
}
