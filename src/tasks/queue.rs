//! Task queue: validated submission, ordering and the forward-only lifecycle.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::task::{Task, TaskSubmission, LEVEL_RANGE};
use crate::error::{CoordinatorError, Result};
use crate::types::{TaskOutcome, TaskStatus};
use crate::{generate_id, Id};

/// Owns live tasks and archives terminal ones.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    /// Pending, assigned and in-progress tasks.
    active: HashMap<Id, Task>,
    /// Completed and failed tasks, in completion order. Never mutated.
    archive: Vec<Task>,
    /// Required length of task state vectors.
    state_dim: usize,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new(state_dim: usize) -> Self {
        Self {
            active: HashMap::new(),
            archive: Vec::new(),
            state_dim,
        }
    }

    /// Validates and enqueues a task as `Pending`.
    ///
    /// # Errors
    ///
    /// `ValidationError` if priority or complexity is outside `[1, 10]`, the
    /// required-skill set is empty, the reward is not finite, the state
    /// vector is malformed, or the id is already known.
    pub fn submit_task(&mut self, submission: TaskSubmission) -> Result<Task> {
        if !LEVEL_RANGE.contains(&submission.priority) {
            return Err(CoordinatorError::validation(format!(
                "priority {} out of range [1, 10]",
                submission.priority
            )));
        }
        if !LEVEL_RANGE.contains(&submission.complexity) {
            return Err(CoordinatorError::validation(format!(
                "complexity {} out of range [1, 10]",
                submission.complexity
            )));
        }
        if submission.required_skills.is_empty() {
            return Err(CoordinatorError::validation(
                "required skill set must not be empty",
            ));
        }
        if !submission.reward.is_finite() {
            return Err(CoordinatorError::validation("reward must be finite"));
        }
        if let Some(state) = &submission.state {
            if state.len() != self.state_dim {
                return Err(CoordinatorError::validation(format!(
                    "state vector must have {} values, got {}",
                    self.state_dim,
                    state.len()
                )));
            }
            if state.iter().any(|v| !v.is_finite()) {
                return Err(CoordinatorError::validation("state vector must be finite"));
            }
        }

        let id = match submission.id {
            Some(id) if id.trim().is_empty() => {
                return Err(CoordinatorError::validation("task id must not be empty"))
            }
            Some(id) => id,
            None => generate_id(),
        };
        if self.contains(&id) {
            return Err(CoordinatorError::validation(format!(
                "task {} already submitted",
                id
            )));
        }

        let task = Task {
            id,
            priority: submission.priority,
            complexity: submission.complexity,
            required_skills: submission.required_skills,
            reward: submission.reward,
            deadline: submission.deadline,
            status: TaskStatus::Pending,
            assigned_agent: None,
            state: submission.state,
            action_labels: submission.action_labels,
        };
        debug!(task_id = %task.id, priority = task.priority, "Task submitted");
        self.active.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Pending tasks by priority (high first), then earliest deadline, then id.
    pub fn pending_tasks(&self) -> Vec<Task> {
        let mut pending: Vec<Task> = self
            .active
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.deadline.cmp(&b.deadline))
                .then_with(|| a.id.cmp(&b.id))
        });
        pending
    }

    /// Moves a pending task to `Assigned`.
    pub(crate) fn assign(&mut self, id: &str, agent_id: &str) -> Result<Task> {
        let task = self.transition(id, TaskStatus::Assigned)?;
        task.assigned_agent = Some(agent_id.to_string());
        Ok(task.clone())
    }

    /// Signals that an assigned task has started.
    pub fn mark_started(&mut self, id: &str) -> Result<Task> {
        let task = self.transition(id, TaskStatus::InProgress)?;
        debug!(task_id = %id, "Task started");
        Ok(task.clone())
    }

    /// Records the outcome of an in-progress task and archives it.
    pub fn complete(&mut self, id: &str, outcome: TaskOutcome) -> Result<Task> {
        self.transition(id, outcome.status())?;
        let task = self
            .active
            .remove(id)
            .ok_or_else(|| CoordinatorError::validation(format!("unknown task {}", id)))?;
        debug!(task_id = %id, status = %task.status, "Task archived");
        self.archive.push(task.clone());
        Ok(task)
    }

    fn transition(&mut self, id: &str, to: TaskStatus) -> Result<&mut Task> {
        let task = match self.active.get_mut(id) {
            Some(task) => task,
            None if self.archive.iter().any(|t| t.id == id) => {
                return Err(CoordinatorError::validation(format!(
                    "task {} is archived and immutable",
                    id
                )))
            }
            None => return Err(CoordinatorError::validation(format!("unknown task {}", id))),
        };
        if !task.status.can_transition_to(to) {
            warn!(task_id = %id, from = %task.status, to = %to, "Rejected task transition");
            return Err(CoordinatorError::validation(format!(
                "task {} cannot move from {} to {}",
                id, task.status, to
            )));
        }
        task.status = to;
        Ok(task)
    }

    /// Looks up a live or archived task.
    pub fn get(&self, id: &str) -> Option<Task> {
        self.active
            .get(id)
            .or_else(|| self.archive.iter().find(|t| t.id == id))
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id) || self.archive.iter().any(|t| t.id == id)
    }

    /// Live tasks in id order, followed by archived tasks in completion order.
    pub fn tasks(&self) -> Vec<Task> {
        let mut live: Vec<Task> = self.active.values().cloned().collect();
        live.sort_by(|a, b| a.id.cmp(&b.id));
        live.extend(self.archive.iter().cloned());
        live
    }

    pub fn archived(&self) -> &[Task] {
        &self.archive
    }

    /// Number of live tasks currently held by `agent_id`.
    pub fn open_tasks_for(&self, agent_id: &str) -> usize {
        self.active
            .values()
            .filter(|t| t.assigned_agent.as_deref() == Some(agent_id))
            .count()
    }

    /// Number of live (non-archived) tasks.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drops every live and archived task.
    pub fn clear(&mut self) {
        self.active.clear();
        self.archive.clear();
    }
}
