//! A single stored transition.

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One `(state, action, reward, next_state, done)` transition.
///
/// Records are immutable once pushed into a [`super::ReplayMemory`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionRecord {
    /// Observation before the action.
    pub state: Vec<f64>,
    /// Index of the chosen action.
    pub action: usize,
    /// Reward received for the action.
    pub reward: f64,
    /// Observation after the action.
    pub next_state: Vec<f64>,
    /// Whether this transition ended its episode.
    pub done: bool,
    /// Opaque sampling weight, used only in prioritized mode.
    pub priority: Option<f64>,
    /// When the transition was recorded.
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Creates a non-terminal transition stamped with the current time.
    pub fn new(state: Vec<f64>, action: usize, reward: f64, next_state: Vec<f64>) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done: false,
            priority: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the sampling priority.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Marks the transition as terminal.
    pub fn terminal(mut self) -> Self {
        self.done = true;
        self
    }
}
