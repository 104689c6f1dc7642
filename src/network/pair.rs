//! A single main/target parameter pair.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Id;

/// Immutable, shareable parameter blob.
///
/// Cloning is cheap. A handle is never modified after creation; publishing
/// new parameters creates a new handle with a higher version.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterHandle {
    version: u64,
    values: Arc<Vec<f64>>,
}

impl ParameterHandle {
    pub fn new(version: u64, values: Vec<f64>) -> Self {
        Self {
            version,
            values: Arc::new(values),
        }
    }

    /// Zero-initialized blob of `len` parameters at version 0.
    pub fn zeros(len: usize) -> Self {
        Self::new(0, vec![0.0; len])
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Main and target parameters for one agent, plus step bookkeeping.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkPair {
    id: Id,
    agent_id: Id,
    main: ParameterHandle,
    target: ParameterHandle,
    training_steps: u64,
    sync_frequency: u64,
    last_sync_step: u64,
    average_loss: f64,
}

/// Read-only copy of a pair handed to external consumers.
pub type NetworkPairSnapshot = NetworkPair;

impl NetworkPair {
    pub(crate) fn new(id: Id, agent_id: Id, sync_frequency: u64, parameter_count: usize) -> Self {
        let initial = ParameterHandle::zeros(parameter_count);
        Self {
            id,
            agent_id,
            main: initial.clone(),
            target: initial,
            training_steps: 0,
            sync_frequency,
            last_sync_step: 0,
            average_loss: 0.0,
        }
    }

    /// Counts one training step and folds `loss` into the running mean.
    ///
    /// Returns true if this step triggered a target sync.
    pub(crate) fn record_step(&mut self, loss: f64) -> bool {
        self.training_steps += 1;
        self.average_loss += (loss - self.average_loss) / self.training_steps as f64;
        if self.training_steps % self.sync_frequency == 0 {
            self.sync_target();
            true
        } else {
            false
        }
    }

    /// Copies main into target as a single handle swap.
    pub(crate) fn sync_target(&mut self) {
        self.target = self.main.clone();
        self.last_sync_step = self.training_steps;
    }

    pub(crate) fn publish_main(&mut self, values: Vec<f64>) {
        self.main = ParameterHandle::new(self.main.version() + 1, values);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn main(&self) -> &ParameterHandle {
        &self.main
    }

    pub fn target(&self) -> &ParameterHandle {
        &self.target
    }

    pub fn training_steps(&self) -> u64 {
        self.training_steps
    }

    pub fn sync_frequency(&self) -> u64 {
        self.sync_frequency
    }

    pub fn last_sync_step(&self) -> u64 {
        self.last_sync_step
    }

    pub fn average_loss(&self) -> f64 {
        self.average_loss
    }

    /// True when the step counter sits exactly on a sync boundary.
    pub fn is_synced(&self) -> bool {
        self.training_steps == self.last_sync_step
    }
}
