//! Task-to-agent allocation.
//!
//! A [`ScoringStrategy`] rates each available agent for a task; the
//! [`Allocator`] picks the best one, updates the task and agent, and records
//! the decision as a replay transition.

pub mod allocator;
pub mod strategy;
pub mod weighted;

pub use allocator::Allocator;
pub use strategy::ScoringStrategy;
pub use weighted::{ScoringWeights, WeightedScorer};
