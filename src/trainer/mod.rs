//! External trainer collaborator.
//!
//! Everything stochastic the coordinator needs (state samples, synthetic
//! episodes, loss and parameter updates) comes through the [`Trainer`] trait,
//! so runs are reproducible given a seeded implementation.

pub mod seeded;
pub mod trait_;

pub use seeded::SeededTrainer;
pub use trait_::{EpisodeReport, Trainer, TrainingUpdate};
