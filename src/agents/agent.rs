//! Agent entity and its registration input.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};
use crate::types::AgentStatus;
use crate::Id;

/// Mean Q-value assumed for agents without estimates.
pub const DEFAULT_AVG_Q_VALUE: f64 = 0.5;

/// A learning agent that can be assigned tasks.
///
/// Agents are owned by the [`super::AgentRegistry`]; everything handed out is
/// a copy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Agent {
    /// Unique identifier.
    pub id: Id,
    /// Skill tags matched against task requirements.
    pub capabilities: BTreeSet<String>,
    /// Performance score in `[0, 100]`.
    pub performance: f64,
    /// Confidence score in `[0, 100]`.
    pub confidence: f64,
    /// Expected-return estimates, each in `[0, 1]`.
    pub q_values: Vec<f64>,
    pub status: AgentStatus,
    /// Id of the agent's main/target network pair, if DQN is enabled.
    pub network_pair: Option<Id>,
}

/// Read-only copy of an agent handed to external consumers.
pub type AgentSnapshot = Agent;

impl Agent {
    /// Mean of the Q-value vector, or 0.5 if it is empty.
    pub fn avg_q_value(&self) -> f64 {
        if self.q_values.is_empty() {
            DEFAULT_AVG_Q_VALUE
        } else {
            self.q_values.iter().sum::<f64>() / self.q_values.len() as f64
        }
    }

    /// Number of `required` skills this agent has.
    pub fn skill_matches(&self, required: &BTreeSet<String>) -> usize {
        self.capabilities.intersection(required).count()
    }

    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }
}

/// Input for registering an agent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentDefinition {
    pub id: Id,
    pub capabilities: BTreeSet<String>,
    pub performance: f64,
    pub confidence: f64,
    pub q_values: Vec<f64>,
    /// Initial status; defaults to `Idle`.
    pub status: AgentStatus,
}

impl AgentDefinition {
    /// Creates a definition with the given skills and neutral scores.
    pub fn new<I, S>(id: impl Into<Id>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            performance: 50.0,
            confidence: 50.0,
            q_values: Vec::new(),
            status: AgentStatus::Idle,
        }
    }

    pub fn with_performance(mut self, performance: f64) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_q_values(mut self, q_values: Vec<f64>) -> Self {
        self.q_values = q_values;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }
}

/// Estimates written back by the external trainer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentEstimates {
    pub performance: f64,
    pub confidence: f64,
    pub q_values: Vec<f64>,
}

pub(crate) fn validate_score(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(CoordinatorError::validation(format!(
            "{} {} out of range [0, 100]",
            name, value
        )))
    }
}

/// Empty vectors are accepted; otherwise the length must be `dim`.
pub(crate) fn validate_q_values(q_values: &[f64], dim: usize) -> Result<()> {
    if !q_values.is_empty() && q_values.len() != dim {
        return Err(CoordinatorError::validation(format!(
            "expected {} q-values, got {}",
            dim,
            q_values.len()
        )));
    }
    if let Some(q) = q_values
        .iter()
        .find(|q| !q.is_finite() || !(0.0..=1.0).contains(*q))
    {
        return Err(CoordinatorError::validation(format!(
            "q-value {} out of range [0, 1]",
            q
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(skills: &[&str], q_values: Vec<f64>) -> Agent {
        Agent {
            id: "a1".into(),
            capabilities: skills.iter().map(|s| s.to_string()).collect(),
            performance: 80.0,
            confidence: 70.0,
            q_values,
            status: AgentStatus::Idle,
            network_pair: None,
        }
    }

    #[test]
    fn avg_q_value_defaults_when_empty() {
        assert_eq!(agent(&[], vec![]).avg_q_value(), DEFAULT_AVG_Q_VALUE);
    }

    #[test]
    fn avg_q_value_is_mean() {
        let a = agent(&[], vec![0.2, 0.4, 0.6, 0.8]);
        assert!((a.avg_q_value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn skill_matches_counts_intersection() {
        let a = agent(&["x", "y", "z"], vec![]);
        let required: BTreeSet<String> = ["y", "z", "w"].iter().map(|s| s.to_string()).collect();
        assert_eq!(a.skill_matches(&required), 2);
    }

    #[test]
    fn score_validation_bounds() {
        assert!(validate_score("performance", 0.0).is_ok());
        assert!(validate_score("performance", 100.0).is_ok());
        assert!(validate_score("performance", 100.5).is_err());
        assert!(validate_score("confidence", f64::NAN).is_err());
    }

    #[test]
    fn q_value_validation() {
        assert!(validate_q_values(&[], 4).is_ok());
        assert!(validate_q_values(&[0.1, 0.2, 0.3, 0.4], 4).is_ok());
        assert!(validate_q_values(&[0.1, 0.2], 4).is_err());
        assert!(validate_q_values(&[0.1, 0.2, 1.3, 0.4], 4).is_err());
    }

    #[test]
    fn definition_builder_defaults_to_idle() {
        let def = AgentDefinition::new("a1", ["x"]).with_performance(90.0);
        assert_eq!(def.status, AgentStatus::Idle);
        assert_eq!(def.performance, 90.0);
        assert!(def.capabilities.contains("x"));
    }
}
