//! Training metrics aggregation.
//!
//! Rolls up episode, step, loss and exploration statistics. External
//! consumers only ever see [`MetricsSnapshot`] copies.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::TaskOutcome;

/// Smoothing factor for the loss and convergence moving averages.
const EMA_FACTOR: f64 = 0.1;

/// Slice of [`crate::RLConfig`] the aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsConfig {
    pub initial_exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub exploration_decay: f64,
    pub adaptation_enabled: bool,
    pub reward_threshold: f64,
    pub convergence_target: f64,
}

/// Immutable copy of the aggregated metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsSnapshot {
    pub episode_count: u64,
    pub total_steps: u64,
    /// Mean episode reward.
    pub average_reward: f64,
    /// Completed / (completed + failed), in `[0, 1]`.
    pub success_rate: f64,
    /// Moving average of episodes reaching the reward threshold, in `[0, 1]`.
    pub convergence_rate: f64,
    /// Current ε, never below the configured floor.
    pub exploration_rate: f64,
    /// Moving average of reported training losses.
    pub dqn_loss: f64,
    pub target_network_updates: u64,
    pub replay_size: usize,
}

/// Running aggregation of training statistics.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    config: MetricsConfig,
    episode_count: u64,
    total_steps: u64,
    reward_sum: f64,
    completed: u64,
    failed: u64,
    convergence_rate: f64,
    exploration_rate: f64,
    /// None until the first loss report.
    dqn_loss: Option<f64>,
    target_network_updates: u64,
    replay_size: usize,
}

impl MetricsAggregator {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            episode_count: 0,
            total_steps: 0,
            reward_sum: 0.0,
            completed: 0,
            failed: 0,
            convergence_rate: 0.0,
            exploration_rate: config
                .initial_exploration_rate
                .max(config.min_exploration_rate)
                .min(1.0),
            dqn_loss: None,
            target_network_updates: 0,
            replay_size: 0,
        }
    }

    /// Records a finished episode and applies one exploration decay step.
    pub fn record_episode(&mut self, reward: f64, steps: u64) {
        self.episode_count += 1;
        self.total_steps += steps;
        if reward.is_finite() {
            self.reward_sum += reward;
        }

        let converged = if reward >= self.config.reward_threshold {
            1.0
        } else {
            0.0
        };
        self.convergence_rate += EMA_FACTOR * (converged - self.convergence_rate);
        self.convergence_rate = self.convergence_rate.clamp(0.0, 1.0);

        if self.config.adaptation_enabled {
            self.exploration_rate = (self.exploration_rate * self.config.exploration_decay)
                .max(self.config.min_exploration_rate);
        }
    }

    /// Folds a training loss into the moving average. Invalid losses are ignored.
    pub fn record_training_step(&mut self, loss: f64) {
        if !loss.is_finite() || loss < 0.0 {
            return;
        }
        self.dqn_loss = Some(match self.dqn_loss {
            None => loss,
            Some(prev) => prev + EMA_FACTOR * (loss - prev),
        });
    }

    pub fn record_target_sync(&mut self) {
        self.target_network_updates += 1;
    }

    /// Records the outcome of a finished task.
    pub fn record_task_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Completed => self.completed += 1,
            TaskOutcome::Failed => self.failed += 1,
        }
    }

    pub fn set_replay_size(&mut self, size: usize) {
        self.replay_size = size;
    }

    /// True once the convergence rate reaches the configured target.
    pub fn is_converged(&self) -> bool {
        self.convergence_rate >= self.config.convergence_target
    }

    /// Returns an independent copy of the current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let outcomes = self.completed + self.failed;
        MetricsSnapshot {
            episode_count: self.episode_count,
            total_steps: self.total_steps,
            average_reward: if self.episode_count > 0 {
                self.reward_sum / self.episode_count as f64
            } else {
                0.0
            },
            success_rate: if outcomes > 0 {
                self.completed as f64 / outcomes as f64
            } else {
                0.0
            },
            convergence_rate: self.convergence_rate,
            exploration_rate: self.exploration_rate,
            dqn_loss: self.dqn_loss.unwrap_or(0.0),
            target_network_updates: self.target_network_updates,
            replay_size: self.replay_size,
        }
    }

    /// Restores the initial state for the current configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Training Metrics ({} episodes) ===", self.episode_count)?;
        writeln!(f, "  Total steps:             {}", self.total_steps)?;
        writeln!(f, "  Average reward:          {:.3}", self.average_reward)?;
        writeln!(f, "  Success rate:            {:.1}%", self.success_rate * 100.0)?;
        writeln!(
            f,
            "  Convergence rate:        {:.1}%",
            self.convergence_rate * 100.0
        )?;
        writeln!(f, "  Exploration rate:        {:.4}", self.exploration_rate)?;
        writeln!(f, "  DQN loss:                {:.4}", self.dqn_loss)?;
        writeln!(f, "  Target network updates:  {}", self.target_network_updates)?;
        writeln!(f, "  Replay size:             {}", self.replay_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MetricsConfig {
        MetricsConfig {
            initial_exploration_rate: 0.5,
            min_exploration_rate: 0.05,
            exploration_decay: 0.9,
            adaptation_enabled: true,
            reward_threshold: 0.8,
            convergence_target: 0.5,
        }
    }

    #[test]
    fn fresh_snapshot_is_zeroed() {
        let m = MetricsAggregator::new(config());
        let s = m.snapshot();
        assert_eq!(s.episode_count, 0);
        assert_eq!(s.average_reward, 0.0);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.exploration_rate, 0.5);
    }

    #[test]
    fn exploration_never_drops_below_floor() {
        let mut m = MetricsAggregator::new(config());
        for _ in 0..10_000 {
            m.record_episode(0.0, 1);
            assert!(m.snapshot().exploration_rate >= 0.05);
        }
        assert_eq!(m.snapshot().exploration_rate, 0.05);
    }

    #[test]
    fn exploration_is_fixed_without_adaptation() {
        let mut m = MetricsAggregator::new(MetricsConfig {
            adaptation_enabled: false,
            ..config()
        });
        m.record_episode(1.0, 10);
        assert_eq!(m.snapshot().exploration_rate, 0.5);
    }

    #[test]
    fn episodes_roll_up_rewards_and_steps() {
        let mut m = MetricsAggregator::new(config());
        m.record_episode(1.0, 10);
        m.record_episode(0.0, 20);
        let s = m.snapshot();
        assert_eq!(s.episode_count, 2);
        assert_eq!(s.total_steps, 30);
        assert!((s.average_reward - 0.5).abs() < 1e-12);
    }

    #[test]
    fn convergence_rate_stays_bounded_and_rises() {
        let mut m = MetricsAggregator::new(config());
        for _ in 0..100 {
            m.record_episode(1.0, 1);
            let c = m.snapshot().convergence_rate;
            assert!((0.0..=1.0).contains(&c));
        }
        assert!(m.is_converged());
    }

    #[test]
    fn success_rate_counts_outcomes() {
        let mut m = MetricsAggregator::new(config());
        m.record_task_outcome(TaskOutcome::Completed);
        m.record_task_outcome(TaskOutcome::Completed);
        m.record_task_outcome(TaskOutcome::Failed);
        m.record_task_outcome(TaskOutcome::Completed);
        assert!((m.snapshot().success_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn loss_is_smoothed_and_invalid_values_ignored() {
        let mut m = MetricsAggregator::new(config());
        m.record_training_step(1.0);
        m.record_training_step(f64::NAN);
        m.record_training_step(-2.0);
        assert_eq!(m.snapshot().dqn_loss, 1.0);
        m.record_training_step(0.0);
        assert!((m.snapshot().dqn_loss - 0.9).abs() < 1e-12);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut m = MetricsAggregator::new(config());
        let before = m.snapshot();
        m.record_target_sync();
        m.set_replay_size(7);
        assert_eq!(before.target_network_updates, 0);
        let after = m.snapshot();
        assert_eq!(after.target_network_updates, 1);
        assert_eq!(after.replay_size, 7);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut m = MetricsAggregator::new(config());
        m.record_episode(1.0, 5);
        m.record_training_step(0.3);
        m.reset();
        assert_eq!(m.snapshot(), MetricsAggregator::new(config()).snapshot());
    }

    #[test]
    fn display_lists_all_metrics() {
        let s = MetricsAggregator::new(config()).snapshot().to_string();
        assert!(s.contains("Training Metrics (0 episodes)"));
        assert!(s.contains("Exploration rate"));
        assert!(s.contains("Replay size"));
    }
}
