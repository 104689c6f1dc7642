//! Configuration for the training coordinator.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};
use crate::metrics::MetricsConfig;
use crate::replay::ReplayMode;

/// Configuration for the RL training coordinator.
///
/// Controls exploration, replay memory, target-network cadence, metric
/// thresholds and the scheduler tick. Every numeric field has a documented
/// range; [`RLConfig::validate`] rejects anything outside it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RLConfig {
    // --- Exploration ---
    /// Initial exploration rate ε, in `[min_exploration_rate, 1]`.
    pub exploration_rate: f64,
    /// Floor ε_min for exploration decay, in `[0, 1]`.
    pub min_exploration_rate: f64,
    /// Multiplicative decay applied once per episode, in `(0, 1]`.
    pub exploration_decay: f64,
    /// When false, ε stays at its initial value.
    pub adaptation_enabled: bool,

    // --- Learning ---
    /// Learning rate handed to the external trainer, in `(0, 1]`.
    pub learning_rate: f64,
    /// Discount factor γ, in `[0, 1]`.
    pub discount_factor: f64,
    /// Episode reward at or above which an episode counts as converged.
    pub reward_threshold: f64,
    /// Convergence rate at which training is considered converged, in `(0, 1]`.
    pub convergence_target: f64,

    // --- DQN ---
    pub dqn_enabled: bool,
    pub double_q_enabled: bool,
    /// Training steps between target-network syncs. Must be > 0.
    pub target_network_update_freq: u64,
    /// Length of each main/target parameter blob.
    pub parameter_count: usize,

    // --- Replay memory ---
    /// Replay memory capacity C. Must be > 0.
    pub memory_size: usize,
    /// Default batch size for replay sampling, in `[1, memory_size]`.
    pub batch_size: usize,
    pub prioritized_replay_enabled: bool,
    /// Priority exponent α for prioritized sampling. Must be > 0.
    pub priority_alpha: f64,

    // --- Encoding ---
    /// Length of task state vectors written to replay.
    pub state_dim: usize,
    /// Length of agent Q-value vectors (empty vectors are also accepted).
    pub q_value_dim: usize,

    // --- Scheduler ---
    /// Interval between coordinator ticks.
    pub tick_interval: Duration,
    /// Seed for the default trainer and replay sampling.
    pub seed: u64,
}

impl RLConfig {
    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(CoordinatorError::configuration(msg))
            }
        }

        check(
            (0.0..=1.0).contains(&self.min_exploration_rate),
            "min_exploration_rate must be in [0, 1]",
        )?;
        check(
            self.exploration_rate >= self.min_exploration_rate && self.exploration_rate <= 1.0,
            "exploration_rate must be in [min_exploration_rate, 1]",
        )?;
        check(
            self.exploration_decay > 0.0 && self.exploration_decay <= 1.0,
            "exploration_decay must be in (0, 1]",
        )?;
        check(
            self.learning_rate > 0.0 && self.learning_rate <= 1.0,
            "learning_rate must be in (0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&self.discount_factor),
            "discount_factor must be in [0, 1]",
        )?;
        check(
            self.reward_threshold.is_finite(),
            "reward_threshold must be finite",
        )?;
        check(
            self.convergence_target > 0.0 && self.convergence_target <= 1.0,
            "convergence_target must be in (0, 1]",
        )?;
        check(
            self.target_network_update_freq > 0,
            "target_network_update_freq must be > 0",
        )?;
        check(self.parameter_count > 0, "parameter_count must be > 0")?;
        check(self.memory_size > 0, "memory_size must be > 0")?;
        check(
            self.batch_size > 0 && self.batch_size <= self.memory_size,
            "batch_size must be in [1, memory_size]",
        )?;
        check(
            self.priority_alpha.is_finite() && self.priority_alpha > 0.0,
            "priority_alpha must be > 0",
        )?;
        check(self.state_dim > 0, "state_dim must be > 0")?;
        check(!self.tick_interval.is_zero(), "tick_interval must be > 0")?;
        Ok(())
    }

    /// Replay sampling/eviction mode implied by this configuration.
    pub fn replay_mode(&self) -> ReplayMode {
        if self.prioritized_replay_enabled {
            ReplayMode::Prioritized {
                alpha: self.priority_alpha,
            }
        } else {
            ReplayMode::Uniform
        }
    }

    /// Slice of the configuration consumed by the metrics aggregator.
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            initial_exploration_rate: self.exploration_rate,
            min_exploration_rate: self.min_exploration_rate,
            exploration_decay: self.exploration_decay,
            adaptation_enabled: self.adaptation_enabled,
            reward_threshold: self.reward_threshold,
            convergence_target: self.convergence_target,
        }
    }
}

impl Default for RLConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.1,
            min_exploration_rate: 0.01,
            exploration_decay: 0.995,
            adaptation_enabled: true,
            learning_rate: 0.001,
            discount_factor: 0.99,
            reward_threshold: 0.8,
            convergence_target: 0.95,
            dqn_enabled: true,
            double_q_enabled: false,
            target_network_update_freq: 100,
            parameter_count: 16,
            memory_size: 10_000,
            batch_size: 32,
            prioritized_replay_enabled: false,
            priority_alpha: 0.6,
            state_dim: 8,
            q_value_dim: 4,
            tick_interval: Duration::from_millis(2000),
            seed: 42,
        }
    }
}
