//! Coordinator: the engine plus its background scheduler.
//!
//! [`Engine`] is the synchronous, thread-safe core. [`Coordinator`] shares it
//! with a [`TickScheduler`] and exposes the start/pause/reset lifecycle.

pub mod engine;
pub mod scheduler;


use std::sync::Arc;

use tracing::info;

pub use engine::{Engine, TickSummary};
pub use scheduler::TickScheduler;

use crate::allocation::{ScoringStrategy, WeightedScorer};
use crate::config::RLConfig;
use crate::error::{CoordinatorError, Result};
use crate::trainer::{SeededTrainer, Trainer};

/// Owns a shared [`Engine`] and the scheduler that ticks it.
#[derive(Debug)]
pub struct Coordinator {
    engine: Arc<Engine>,
    scheduler: TickScheduler,
}

impl Coordinator {
    /// Builds a coordinator with the default weighted scorer and a trainer
    /// seeded from `config.seed`.
    pub fn new(config: RLConfig) -> Result<Self> {
        let trainer = SeededTrainer::new(config.seed, config.learning_rate);
        Self::with_parts(
            config,
            Box::new(WeightedScorer::default()),
            Box::new(trainer),
        )
    }

    /// Builds a coordinator from explicit collaborators.
    pub fn with_parts(
        config: RLConfig,
        scorer: Box<dyn ScoringStrategy>,
        trainer: Box<dyn Trainer>,
    ) -> Result<Self> {
        let period = config.tick_interval;
        let engine = Engine::new(config, scorer, trainer)?;
        info!(
            dqn = engine.config().dqn_enabled,
            prioritized = engine.config().prioritized_replay_enabled,
            "Coordinator created"
        );
        Ok(Self {
            engine: Arc::new(engine),
            scheduler: TickScheduler::new(period),
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Starts periodic ticking. Calling it while running has no effect.
    ///
    /// # Errors
    ///
    /// `ConcurrencyError` when called outside a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        self.scheduler.start(Arc::clone(&self.engine))?;
        Ok(())
    }

    /// Stops periodic ticking and waits for any in-flight tick.
    pub async fn pause(&mut self) {
        self.scheduler.stop().await;
    }

    /// Clears replay memory and metrics.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::Running`] while the scheduler is active.
    pub fn reset(&self) -> Result<()> {
        if self.is_running() {
            return Err(CoordinatorError::Running);
        }
        self.engine.reset_state()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}
