//! Trainer trait consumed by the coordinator.

/// Summary of one synthetic or real episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeReport {
    /// Environment steps taken during the episode.
    pub steps: u64,
    /// Total episode reward.
    pub reward: f64,
}

/// Result of one training step on an agent's main network.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingUpdate {
    /// Loss of the step; must be finite and non-negative.
    pub loss: f64,
    /// New main parameters, if the step changed them.
    pub parameters: Option<Vec<f64>>,
}

/// Source of training dynamics and randomness.
///
/// The coordinator never generates its own noise; it asks the trainer.
pub trait Trainer: Send {
    /// Returns a state vector of length `dim`.
    fn sample_state(&mut self, dim: usize) -> Vec<f64>;

    /// Runs (or simulates) one episode.
    fn run_episode(&mut self) -> EpisodeReport;

    /// Performs one training step for `agent_id` starting from `main`.
    fn train_step(&mut self, agent_id: &str, main: &[f64]) -> TrainingUpdate;

    /// Returns a human-readable name for this trainer.
    fn name(&self) -> &str;
}
