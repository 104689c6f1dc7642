//! Task entity and its submission input.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::TaskStatus;
use crate::Id;

/// Valid range for `priority` and `complexity`.
pub const LEVEL_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Action label that marks the "assign" action in a task's action space.
pub const ASSIGN_ACTION: &str = "assign";

/// A unit of work that can be allocated to one agent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    pub id: Id,
    /// Priority in `[1, 10]`; higher goes first.
    pub priority: u8,
    /// Complexity in `[1, 10]`.
    pub complexity: u8,
    /// Skills an agent should have. Never empty.
    pub required_skills: BTreeSet<String>,
    /// Reward recorded in replay when the task is allocated.
    pub reward: f64,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
    pub assigned_agent: Option<Id>,
    /// Encoded task state, `state_dim` long when present.
    pub state: Option<Vec<f64>>,
    /// Ordered action labels; empty when the task has no action space.
    pub action_labels: Vec<String>,
}

/// Read-only copy of a task handed to external consumers.
pub type TaskSnapshot = Task;

impl Task {
    /// Index of the first action labelled "assign" (any case), or 0.
    pub fn assign_action_index(&self) -> usize {
        self.action_labels
            .iter()
            .position(|label| label.eq_ignore_ascii_case(ASSIGN_ACTION))
            .unwrap_or(0)
    }

    /// Normalized priority in `(0, 1]`, used as the replay priority.
    pub fn replay_priority(&self) -> f64 {
        f64::from(self.priority) / 10.0
    }
}

/// Input for submitting a task.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskSubmission {
    /// Caller-chosen id; a UUID is generated when absent.
    pub id: Option<Id>,
    pub priority: u8,
    pub complexity: u8,
    pub required_skills: BTreeSet<String>,
    pub reward: f64,
    pub deadline: DateTime<Utc>,
    pub state: Option<Vec<f64>>,
    pub action_labels: Vec<String>,
}

impl TaskSubmission {
    /// Creates a submission with complexity 5 and no state or action space.
    pub fn new<I, S>(priority: u8, required_skills: I, reward: f64, deadline: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            priority,
            complexity: 5,
            required_skills: required_skills.into_iter().map(Into::into).collect(),
            reward,
            deadline,
            state: None,
            action_labels: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_state(mut self, state: Vec<f64>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_action_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_labels = labels.into_iter().map(Into::into).collect();
        self
    }
}
