//! Status enums shared by the registries, the allocator and the coordinator.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle status of a learning agent.
///
/// Only `Idle` and `Active` agents are eligible for new assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AgentStatus {
    #[default]
    Idle,
    Active,
    Learning,
    Optimizing,
}

impl AgentStatus {
    /// Returns all statuses in order.
    pub fn all() -> [AgentStatus; 4] {
        [
            AgentStatus::Idle,
            AgentStatus::Active,
            AgentStatus::Learning,
            AgentStatus::Optimizing,
        ]
    }

    /// Returns true if an agent in this status can take a new task.
    pub fn is_available(&self) -> bool {
        matches!(self, AgentStatus::Idle | AgentStatus::Active)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Learning => write!(f, "learning"),
            AgentStatus::Optimizing => write!(f, "optimizing"),
        }
    }
}

/// Task lifecycle status.
///
/// ```text
/// Pending -> Assigned -> InProgress -> Completed | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Position in the forward-only lifecycle. Both terminal states share a rank.
    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Assigned => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Completed | TaskStatus::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Returns true if `to` is the immediate successor of `self`.
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        !self.is_terminal() && to.rank() == self.rank() + 1
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Assigned => write!(f, "assigned"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// External outcome reported for a task in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskOutcome {
    Completed,
    Failed,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Completed => TaskStatus::Completed,
            TaskOutcome::Failed => TaskStatus::Failed,
        }
    }
}
