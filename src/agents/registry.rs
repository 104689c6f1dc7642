//! Agent registry: validated registration, lookup and mutation.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::agent::{validate_q_values, validate_score, Agent, AgentDefinition, AgentEstimates};
use crate::error::{CoordinatorError, Result};
use crate::types::AgentStatus;
use crate::Id;

/// Exclusive owner of every registered agent.
///
/// Agents are stored by id, so every listing is in lexical id order.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: BTreeMap<Id, Agent>,
    /// Required length of non-empty Q-value vectors.
    q_value_dim: usize,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new(q_value_dim: usize) -> Self {
        Self {
            agents: BTreeMap::new(),
            q_value_dim,
        }
    }

    /// Registers an agent.
    ///
    /// # Errors
    ///
    /// `ValidationError` if the id is empty or already registered, a score is
    /// outside `[0, 100]`, or the Q-values are malformed.
    pub fn register_agent(&mut self, definition: AgentDefinition) -> Result<Agent> {
        if definition.id.trim().is_empty() {
            return Err(CoordinatorError::validation("agent id must not be empty"));
        }
        if self.agents.contains_key(&definition.id) {
            return Err(CoordinatorError::validation(format!(
                "agent {} already registered",
                definition.id
            )));
        }
        validate_score("performance", definition.performance)?;
        validate_score("confidence", definition.confidence)?;
        validate_q_values(&definition.q_values, self.q_value_dim)?;

        let agent = Agent {
            id: definition.id,
            capabilities: definition.capabilities,
            performance: definition.performance,
            confidence: definition.confidence,
            q_values: definition.q_values,
            status: definition.status,
            network_pair: None,
        };
        debug!(agent_id = %agent.id, skills = agent.capabilities.len(), "Registering agent");
        self.agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    /// Removes an agent and returns its final state.
    pub fn unregister_agent(&mut self, id: &str) -> Result<Agent> {
        debug!(agent_id = %id, "Unregistering agent");
        self.agents.remove(id).ok_or_else(|| {
            warn!(agent_id = %id, "Attempted to unregister non-existent agent");
            CoordinatorError::validation(format!("agent {} is not registered", id))
        })
    }

    /// Agents with status `Idle` or `Active`, in id order.
    pub fn list_available(&self) -> Vec<Agent> {
        self.list_available_with(AgentStatus::is_available)
    }

    /// Agents whose status passes `filter`, in id order.
    pub fn list_available_with<F>(&self, filter: F) -> Vec<Agent>
    where
        F: Fn(&AgentStatus) -> bool,
    {
        self.agents
            .values()
            .filter(|a| filter(&a.status))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Agent> {
        self.agents.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Copies of every agent, in id order.
    pub fn agents(&self) -> Vec<Agent> {
        self.agents.values().cloned().collect()
    }

    /// Sets the status of an agent, returning the previous one.
    pub fn set_status(&mut self, id: &str, status: AgentStatus) -> Result<AgentStatus> {
        let agent = self.agent_mut(id)?;
        let previous = agent.status;
        agent.status = status;
        if previous != status {
            debug!(agent_id = %id, from = %previous, to = %status, "Agent status changed");
        }
        Ok(previous)
    }

    /// Writes trainer-produced estimates after validating them.
    pub fn update_estimates(&mut self, id: &str, estimates: AgentEstimates) -> Result<()> {
        validate_score("performance", estimates.performance)?;
        validate_score("confidence", estimates.confidence)?;
        validate_q_values(&estimates.q_values, self.q_value_dim)?;

        let agent = self.agent_mut(id)?;
        agent.performance = estimates.performance;
        agent.confidence = estimates.confidence;
        agent.q_values = estimates.q_values;
        Ok(())
    }

    pub(crate) fn attach_network_pair(&mut self, id: &str, pair_id: Id) -> Result<()> {
        self.agent_mut(id)?.network_pair = Some(pair_id);
        Ok(())
    }

    fn agent_mut(&mut self, id: &str) -> Result<&mut Agent> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::validation(format!("agent {} is not registered", id)))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(4)
    }

    #[test]
    fn register_and_get() {
        let mut reg = registry();
        let agent = reg
            .register_agent(AgentDefinition::new("a1", ["x"]))
            .unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(reg.get("a1"), Some(agent));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("a1", ["x"])).unwrap();
        let err = reg
            .register_agent(AgentDefinition::new("a1", ["y"]))
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Validation(_)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut reg = registry();
        assert!(reg.register_agent(AgentDefinition::new("  ", ["x"])).is_err());
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let mut reg = registry();
        assert!(reg
            .register_agent(AgentDefinition::new("a1", ["x"]).with_performance(120.0))
            .is_err());
        assert!(reg
            .register_agent(AgentDefinition::new("a1", ["x"]).with_confidence(-1.0))
            .is_err());
        assert!(reg
            .register_agent(AgentDefinition::new("a1", ["x"]).with_q_values(vec![0.5; 3]))
            .is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn list_available_filters_status_and_orders_by_id() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("c", ["x"])).unwrap();
        reg.register_agent(AgentDefinition::new("a", ["x"]).with_status(AgentStatus::Active))
            .unwrap();
        reg.register_agent(AgentDefinition::new("b", ["x"]).with_status(AgentStatus::Learning))
            .unwrap();

        let ids: Vec<_> = reg.list_available().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let learning: Vec<_> = reg
            .list_available_with(|s| *s == AgentStatus::Learning)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(learning, vec!["b"]);
    }

    #[test]
    fn unregister_removes_agent() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("a1", ["x"])).unwrap();
        assert!(reg.unregister_agent("a1").is_ok());
        assert!(!reg.contains("a1"));
        assert!(reg.unregister_agent("a1").is_err());
    }

    #[test]
    fn returned_agents_are_copies() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("a1", ["x"])).unwrap();
        let mut copy = reg.get("a1").unwrap();
        copy.performance = 0.0;
        assert_eq!(reg.get("a1").unwrap().performance, 50.0);
    }

    #[test]
    fn update_estimates_validates_and_writes() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("a1", ["x"])).unwrap();
        let estimates = AgentEstimates {
            performance: 75.0,
            confidence: 60.0,
            q_values: vec![0.1, 0.2, 0.3, 0.4],
        };
        reg.update_estimates("a1", estimates).unwrap();
        let agent = reg.get("a1").unwrap();
        assert_eq!(agent.performance, 75.0);
        assert_eq!(agent.q_values.len(), 4);

        let bad = AgentEstimates {
            performance: 101.0,
            confidence: 60.0,
            q_values: vec![],
        };
        assert!(reg.update_estimates("a1", bad).is_err());
        assert_eq!(reg.get("a1").unwrap().performance, 75.0);
    }

    #[test]
    fn set_status_returns_previous() {
        let mut reg = registry();
        reg.register_agent(AgentDefinition::new("a1", ["x"])).unwrap();
        let prev = reg.set_status("a1", AgentStatus::Optimizing).unwrap();
        assert_eq!(prev, AgentStatus::Idle);
        assert!(reg.list_available().is_empty());
    }
}
