//! Scoring strategy trait for allocation.

use crate::agents::Agent;
use crate::tasks::Task;

/// Rates how well an agent fits a task. Higher is better.
///
/// Implementations must be deterministic: the same agent and task always
/// produce the same score.
pub trait ScoringStrategy: Send + Sync {
    /// Scores `agent` for `task`.
    fn score(&self, agent: &Agent, task: &Task) -> f64;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &str;
}
