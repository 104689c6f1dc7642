//! Linear weighted scoring.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::strategy::ScoringStrategy;
use crate::agents::Agent;
use crate::error::{CoordinatorError, Result};
use crate::tasks::Task;

/// Weights of the linear allocation score.
///
/// ```text
/// score = q·avg_q + performance·(perf/100) + skill_match·matches + confidence·(conf/100)
/// ```
///
/// The defaults let the skill-match term dominate, so any matching skill
/// outweighs every other signal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoringWeights {
    pub q_value: f64,
    pub performance: f64,
    /// Weight per matched skill.
    pub skill_match: f64,
    pub confidence: f64,
}

impl ScoringWeights {
    /// Number of weights.
    pub const LEN: usize = 4;

    /// Builds weights from `[q_value, performance, skill_match, confidence]`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the slice length is not 4 or a weight is not
    /// finite.
    pub fn from_slice(weights: &[f64]) -> Result<Self> {
        if weights.len() != Self::LEN {
            return Err(CoordinatorError::configuration(format!(
                "expected {} scoring weights, got {}",
                Self::LEN,
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(CoordinatorError::configuration(
                "scoring weights must be finite",
            ));
        }
        Ok(Self {
            q_value: weights[0],
            performance: weights[1],
            skill_match: weights[2],
            confidence: weights[3],
        })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.q_value, self.performance, self.skill_match, self.confidence]
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            q_value: 0.4,
            performance: 0.3,
            skill_match: 20.0,
            confidence: 0.1,
        }
    }
}

/// Default scoring strategy: a weighted sum of agent signals.
#[derive(Debug, Clone, Default)]
pub struct WeightedScorer {
    weights: ScoringWeights,
}

impl WeightedScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Builds a scorer from a raw weight vector. See [`ScoringWeights::from_slice`].
    pub fn from_slice(weights: &[f64]) -> Result<Self> {
        ScoringWeights::from_slice(weights).map(Self::new)
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }
}

impl ScoringStrategy for WeightedScorer {
    fn score(&self, agent: &Agent, task: &Task) -> f64 {
        let w = &self.weights;
        w.q_value * agent.avg_q_value()
            + w.performance * (agent.performance / 100.0)
            + w.skill_match * agent.skill_matches(&task.required_skills) as f64
            + w.confidence * (agent.confidence / 100.0)
    }

    fn name(&self) -> &str {
        "weighted"
    }
}
