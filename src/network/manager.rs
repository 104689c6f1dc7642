//! Registry of network pairs keyed by agent id.

use std::collections::BTreeMap;

use tracing::debug;

use super::pair::{NetworkPair, NetworkPairSnapshot};
use crate::error::{CoordinatorError, Result};
use crate::{generate_id, Id};

/// Result of recording one training step.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStepOutcome {
    pub agent_id: Id,
    /// Step counter after the increment.
    pub step: u64,
    /// Whether this step copied main into target.
    pub synced: bool,
}

/// Owns every agent's [`NetworkPair`] and drives the sync cadence.
///
/// The sync is counter-driven: after step `k` with `k % sync_frequency == 0`
/// the target equals the main parameters at that instant, and it is left
/// untouched between syncs.
#[derive(Debug, Clone)]
pub struct NetworkPairManager {
    pairs: BTreeMap<Id, NetworkPair>,
    sync_frequency: u64,
    parameter_count: usize,
}

impl NetworkPairManager {
    /// Creates an empty manager.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if `sync_frequency == 0` or `parameter_count == 0`.
    pub fn new(sync_frequency: u64, parameter_count: usize) -> Result<Self> {
        if sync_frequency == 0 {
            return Err(CoordinatorError::configuration(
                "sync frequency must be > 0",
            ));
        }
        if parameter_count == 0 {
            return Err(CoordinatorError::configuration(
                "parameter count must be > 0",
            ));
        }
        Ok(Self {
            pairs: BTreeMap::new(),
            sync_frequency,
            parameter_count,
        })
    }

    /// Creates a pair for `agent_id` and returns the pair id.
    ///
    /// An agent already owning a pair keeps it.
    pub fn create_pair(&mut self, agent_id: &str) -> Id {
        let sync_frequency = self.sync_frequency;
        let parameter_count = self.parameter_count;
        let pair = self.pairs.entry(agent_id.to_string()).or_insert_with(|| {
            NetworkPair::new(
                generate_id(),
                agent_id.to_string(),
                sync_frequency,
                parameter_count,
            )
        });
        debug!(agent_id = %agent_id, pair_id = %pair.id(), "Network pair ready");
        pair.id().to_string()
    }

    /// Drops the pair owned by `agent_id`, if any.
    pub fn remove_pair(&mut self, agent_id: &str) -> Option<NetworkPair> {
        self.pairs.remove(agent_id)
    }

    /// Counts one training step for `agent_id`, syncing target on the cadence.
    ///
    /// # Errors
    ///
    /// `ValidationError` if the agent has no pair or `loss` is negative or
    /// not finite.
    pub fn record_training_step(&mut self, agent_id: &str, loss: f64) -> Result<TrainingStepOutcome> {
        if !loss.is_finite() || loss < 0.0 {
            return Err(CoordinatorError::validation(format!(
                "loss must be finite and >= 0, got {}",
                loss
            )));
        }
        let pair = self.pair_mut(agent_id)?;
        let synced = pair.record_step(loss);
        if synced {
            debug!(
                agent_id = %agent_id,
                step = pair.training_steps(),
                main_version = pair.main().version(),
                "Target network synced"
            );
        }
        Ok(TrainingStepOutcome {
            agent_id: agent_id.to_string(),
            step: pair.training_steps(),
            synced,
        })
    }

    /// Publishes new main parameters produced by the external trainer.
    ///
    /// # Errors
    ///
    /// `ValidationError` if the agent has no pair, the length differs from the
    /// configured parameter count, or a value is not finite.
    pub fn update_main(&mut self, agent_id: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.parameter_count {
            return Err(CoordinatorError::validation(format!(
                "expected {} parameters, got {}",
                self.parameter_count,
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoordinatorError::validation("parameters must be finite"));
        }
        self.pair_mut(agent_id)?.publish_main(values);
        Ok(())
    }

    /// Forces an immediate target sync for `agent_id`.
    pub fn sync_target(&mut self, agent_id: &str) -> Result<()> {
        self.pair_mut(agent_id)?.sync_target();
        Ok(())
    }

    fn pair_mut(&mut self, agent_id: &str) -> Result<&mut NetworkPair> {
        self.pairs.get_mut(agent_id).ok_or_else(|| {
            CoordinatorError::validation(format!("no network pair for agent {}", agent_id))
        })
    }

    pub fn get(&self, agent_id: &str) -> Option<&NetworkPair> {
        self.pairs.get(agent_id)
    }

    pub fn training_steps(&self, agent_id: &str) -> Option<u64> {
        self.get(agent_id).map(NetworkPair::training_steps)
    }

    pub fn last_sync_step(&self, agent_id: &str) -> Option<u64> {
        self.get(agent_id).map(NetworkPair::last_sync_step)
    }

    pub fn average_loss(&self, agent_id: &str) -> Option<f64> {
        self.get(agent_id).map(NetworkPair::average_loss)
    }

    /// Agent ids that own a pair, in id order.
    pub fn agent_ids(&self) -> Vec<Id> {
        self.pairs.keys().cloned().collect()
    }

    /// Copies of every pair, ordered by agent id.
    pub fn snapshots(&self) -> Vec<NetworkPairSnapshot> {
        self.pairs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn sync_frequency(&self) -> u64 {
        self.sync_frequency
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(freq: u64) -> NetworkPairManager {
        let mut m = NetworkPairManager::new(freq, 3).unwrap();
        m.create_pair("a1");
        m
    }

    #[test]
    fn zero_sync_frequency_is_rejected() {
        let err = NetworkPairManager::new(0, 3).unwrap_err();
        assert!(matches!(err, CoordinatorError::Configuration(_)));
    }

    #[test]
    fn create_pair_is_idempotent_per_agent() {
        let mut m = manager(5);
        let first = m.get("a1").unwrap().id().to_string();
        let second = m.create_pair("a1");
        assert_eq!(first, second);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn target_syncs_exactly_on_cadence() {
        let mut m = manager(3);
        m.update_main("a1", vec![1.0, 2.0, 3.0]).unwrap();

        let s1 = m.record_training_step("a1", 0.5).unwrap();
        let s2 = m.record_training_step("a1", 0.5).unwrap();
        assert!(!s1.synced && !s2.synced);
        // target untouched between syncs
        assert_eq!(m.get("a1").unwrap().target().values(), &[0.0, 0.0, 0.0]);

        let s3 = m.record_training_step("a1", 0.5).unwrap();
        assert!(s3.synced);
        assert_eq!(s3.step, 3);
        let pair = m.get("a1").unwrap();
        assert_eq!(pair.target(), pair.main());
        assert_eq!(pair.last_sync_step(), 3);
    }

    #[test]
    fn main_updates_after_sync_do_not_leak_into_target() {
        let mut m = manager(2);
        m.update_main("a1", vec![1.0, 1.0, 1.0]).unwrap();
        m.record_training_step("a1", 0.1).unwrap();
        m.record_training_step("a1", 0.1).unwrap();

        m.update_main("a1", vec![9.0, 9.0, 9.0]).unwrap();
        m.record_training_step("a1", 0.1).unwrap();
        assert_eq!(m.get("a1").unwrap().target().values(), &[1.0, 1.0, 1.0]);

        m.record_training_step("a1", 0.1).unwrap();
        assert_eq!(m.get("a1").unwrap().target().values(), &[9.0, 9.0, 9.0]);
        assert_eq!(m.last_sync_step("a1"), Some(4));
    }

    #[test]
    fn unknown_agent_is_a_validation_error() {
        let mut m = manager(2);
        let err = m.record_training_step("ghost", 0.1).unwrap_err();
        assert!(matches!(err, CoordinatorError::Validation(_)));
    }

    #[test]
    fn negative_or_nan_loss_is_rejected() {
        let mut m = manager(2);
        assert!(m.record_training_step("a1", -1.0).is_err());
        assert!(m.record_training_step("a1", f64::NAN).is_err());
        assert_eq!(m.training_steps("a1"), Some(0));
    }

    #[test]
    fn wrong_parameter_length_is_rejected() {
        let mut m = manager(2);
        assert!(m.update_main("a1", vec![1.0]).is_err());
    }

    #[test]
    fn remove_pair_drops_bookkeeping() {
        let mut m = manager(2);
        assert!(m.remove_pair("a1").is_some());
        assert!(m.is_empty());
        assert_eq!(m.training_steps("a1"), None);
    }
}
