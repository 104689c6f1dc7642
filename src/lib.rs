//! rl_coordinator - reinforcement-learning task coordination
//!
//! Allocates tasks to learning agents by a weighted score, records every
//! decision into a bounded experience-replay memory, keeps main/target network
//! pairs in sync, and aggregates training metrics on a periodic tick.

pub mod agents;
pub mod allocation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod network;
#[cfg(feature = "serde")]
pub mod record;
pub mod replay;
pub mod tasks;
pub mod trainer;
pub mod types;

pub use agents::{Agent, AgentDefinition, AgentEstimates, AgentSnapshot};
pub use allocation::{ScoringStrategy, ScoringWeights, WeightedScorer};
pub use config::RLConfig;
pub use coordinator::{Coordinator, Engine, TickSummary};
pub use error::{AllocationOutcome, CoordinatorError, Result};
pub use metrics::MetricsSnapshot;
pub use network::{NetworkPairSnapshot, TrainingStepOutcome};
pub use replay::{ReplayBufferStats, TransitionRecord};
pub use tasks::{Task, TaskSnapshot, TaskSubmission};
pub use trainer::{SeededTrainer, Trainer};
pub use types::{AgentStatus, TaskOutcome, TaskStatus};

/// Identifier type used for agents, tasks and network pairs.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
