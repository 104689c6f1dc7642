//! Main/target network pairs and their synchronization cadence.
//!
//! Parameter values are produced by an external trainer; this module only
//! counts training steps, tracks loss, and copies main into target every
//! `sync_frequency` steps.

pub mod manager;
pub mod pair;

pub use manager::{NetworkPairManager, TrainingStepOutcome};
pub use pair::{NetworkPair, NetworkPairSnapshot, ParameterHandle};
