//! Reproducible stand-in trainer driven by a seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::{EpisodeReport, Trainer, TrainingUpdate};

/// Trainer that produces jittered dynamics from a seeded [`StdRng`].
///
/// Loss shrinks geometrically with the number of steps taken, and each step
/// nudges every main parameter by at most `learning_rate`. Two trainers with
/// the same seed produce identical sequences.
#[derive(Debug, Clone)]
pub struct SeededTrainer {
    rng: StdRng,
    learning_rate: f64,
    steps: u64,
}

impl SeededTrainer {
    /// Creates a trainer.
    ///
    /// # Arguments
    ///
    /// * `seed` - RNG seed
    /// * `learning_rate` - Maximum per-step parameter change
    pub fn new(seed: u64, learning_rate: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            learning_rate,
            steps: 0,
        }
    }
}

impl Trainer for SeededTrainer {
    fn sample_state(&mut self, dim: usize) -> Vec<f64> {
        (0..dim).map(|_| self.rng.gen::<f64>()).collect()
    }

    fn run_episode(&mut self) -> EpisodeReport {
        EpisodeReport {
            steps: self.rng.gen_range(10..=50),
            reward: self.rng.gen::<f64>(),
        }
    }

    fn train_step(&mut self, _agent_id: &str, main: &[f64]) -> TrainingUpdate {
        self.steps += 1;
        let base = 1.0 / (1.0 + self.steps as f64 * 0.01);
        let loss = base * self.rng.gen_range(0.5..1.5);
        let parameters = main
            .iter()
            .map(|w| w + self.rng.gen_range(-self.learning_rate..=self.learning_rate))
            .collect();
        TrainingUpdate {
            loss,
            parameters: Some(parameters),
        }
    }

    fn name(&self) -> &str {
        "seeded"
    }
}
