//! Bounded experience-replay memory.
//!
//! Stores [`TransitionRecord`]s up to a fixed capacity, evicting one entry
//! per overflowing push, and samples batches uniformly or by priority.

pub mod memory;
pub mod transition;

pub use memory::{ReplayBufferStats, ReplayMemory, ReplayMode};
pub use transition::TransitionRecord;
