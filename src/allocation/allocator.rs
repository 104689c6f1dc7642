//! Allocator: picks an agent for a pending task and records the decision.

use std::fmt;

use tracing::{debug, warn};

use super::strategy::ScoringStrategy;
use crate::agents::{Agent, AgentRegistry};
use crate::error::{AllocationOutcome, CoordinatorError, Result};
use crate::replay::{ReplayMemory, TransitionRecord};
use crate::tasks::{Task, TaskQueue};
use crate::trainer::Trainer;
use crate::types::{AgentStatus, TaskStatus};

/// Matches pending tasks to available agents.
///
/// Selection is deterministic: the highest score wins and ties go to the
/// lexically smallest agent id. All randomness used for replay records comes
/// from the supplied [`Trainer`].
pub struct Allocator {
    strategy: Box<dyn ScoringStrategy>,
    /// Length of fallback state vectors sampled from the trainer.
    state_dim: usize,
    /// Attach `priority / 10` to replay records.
    prioritized: bool,
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("strategy", &self.strategy.name())
            .field("state_dim", &self.state_dim)
            .field("prioritized", &self.prioritized)
            .finish()
    }
}

impl Allocator {
    pub fn new(strategy: Box<dyn ScoringStrategy>, state_dim: usize, prioritized: bool) -> Self {
        Self {
            strategy,
            state_dim,
            prioritized,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Returns the best candidate for `task` and its score.
    ///
    /// `candidates` must be in id order for the tie-break to be lexical.
    /// Candidates with a non-finite score are skipped.
    pub fn select<'a>(&self, candidates: &'a [Agent], task: &Task) -> Option<(&'a Agent, f64)> {
        let mut best: Option<(&Agent, f64)> = None;
        for agent in candidates {
            let score = self.strategy.score(agent, task);
            if !score.is_finite() {
                warn!(agent_id = %agent.id, task_id = %task.id, "Skipping agent with non-finite score");
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((agent, score)),
            }
        }
        best
    }

    /// Allocates one task.
    ///
    /// On success the task becomes `Assigned`, an `Idle` agent becomes
    /// `Active`, and exactly one transition is pushed into `replay`. A task
    /// that is not `Pending` is left alone and reported as `Unchanged`.
    ///
    /// # Errors
    ///
    /// `ValidationError` if `task_id` is unknown.
    pub fn allocate(
        &self,
        task_id: &str,
        agents: &mut AgentRegistry,
        tasks: &mut TaskQueue,
        replay: &mut ReplayMemory,
        trainer: &mut dyn Trainer,
    ) -> Result<AllocationOutcome> {
        let task = tasks
            .get(task_id)
            .ok_or_else(|| CoordinatorError::validation(format!("unknown task {}", task_id)))?;
        if task.status != TaskStatus::Pending {
            return Ok(AllocationOutcome::Unchanged {
                task_id: task.id,
                status: task.status,
            });
        }

        let candidates = agents.list_available();
        let Some((agent_id, agent_status, score)) = self
            .select(&candidates, &task)
            .map(|(agent, score)| (agent.id.clone(), agent.status, score))
        else {
            debug!(task_id = %task.id, "Pending: no agent available");
            return Ok(AllocationOutcome::Deferred { task_id: task.id });
        };

        let assigned = tasks.assign(&task.id, &agent_id)?;
        if agent_status == AgentStatus::Idle {
            agents.set_status(&agent_id, AgentStatus::Active)?;
        }

        let state = match &assigned.state {
            Some(state) => state.clone(),
            None => trainer.sample_state(self.state_dim),
        };
        let next_state = trainer.sample_state(self.state_dim);
        let mut record = TransitionRecord::new(
            state,
            assigned.assign_action_index(),
            assigned.reward,
            next_state,
        );
        if self.prioritized {
            record = record.with_priority(assigned.replay_priority());
        }
        replay.push(record);

        debug!(
            task_id = %assigned.id,
            agent_id = %agent_id,
            score = score,
            strategy = self.strategy.name(),
            "Task assigned"
        );
        Ok(AllocationOutcome::Assigned {
            task_id: assigned.id,
            agent_id,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentDefinition;
    use crate::allocation::WeightedScorer;
    use crate::replay::ReplayMode;
    use crate::tasks::TaskSubmission;
    use crate::trainer::SeededTrainer;
    use crate::types::TaskOutcome;
    use chrono::Utc;

    struct Fixture {
        allocator: Allocator,
        agents: AgentRegistry,
        tasks: TaskQueue,
        replay: ReplayMemory,
        trainer: SeededTrainer,
    }

    impl Fixture {
        fn new(prioritized: bool) -> Self {
            let mode = if prioritized {
                ReplayMode::Prioritized { alpha: 0.6 }
            } else {
                ReplayMode::Uniform
            };
            Self {
                allocator: Allocator::new(Box::new(WeightedScorer::default()), 4, prioritized),
                agents: AgentRegistry::new(4),
                tasks: TaskQueue::new(4),
                replay: ReplayMemory::new(16, mode).unwrap(),
                trainer: SeededTrainer::new(1, 0.01),
            }
        }

        fn allocate(&mut self, task_id: &str) -> AllocationOutcome {
            self.allocator
                .allocate(
                    task_id,
                    &mut self.agents,
                    &mut self.tasks,
                    &mut self.replay,
                    &mut self.trainer,
                )
                .unwrap()
        }

        fn submit(&mut self, id: &str, skills: &[&str]) {
            let sub = TaskSubmission::new(8, skills.iter().copied(), 100.0, Utc::now()).with_id(id);
            self.tasks.submit_task(sub).unwrap();
        }
    }

    #[test]
    fn empty_pool_defers_without_writing() {
        let mut fx = Fixture::new(false);
        fx.submit("t1", &["x"]);
        let outcome = fx.allocate("t1");
        assert!(outcome.is_deferred());
        assert_eq!(fx.tasks.get("t1").unwrap().status, TaskStatus::Pending);
        assert!(fx.replay.is_empty());
    }

    #[test]
    fn unavailable_agents_are_not_considered() {
        let mut fx = Fixture::new(false);
        fx.agents
            .register_agent(AgentDefinition::new("busy", ["x"]).with_status(AgentStatus::Learning))
            .unwrap();
        fx.submit("t1", &["x"]);
        assert!(fx.allocate("t1").is_deferred());
    }

    #[test]
    fn ties_go_to_smallest_id() {
        let mut fx = Fixture::new(false);
        for id in ["charlie", "alpha", "bravo"] {
            fx.agents
                .register_agent(AgentDefinition::new(id, ["x"]))
                .unwrap();
        }
        fx.submit("t1", &["x"]);
        match fx.allocate("t1") {
            AllocationOutcome::Assigned { agent_id, .. } => assert_eq!(agent_id, "alpha"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn success_marks_agent_active_and_writes_one_record() {
        let mut fx = Fixture::new(false);
        fx.agents
            .register_agent(AgentDefinition::new("a1", ["x"]))
            .unwrap();
        fx.submit("t1", &["x"]);
        assert!(fx.allocate("t1").is_assigned());

        assert_eq!(fx.agents.get("a1").unwrap().status, AgentStatus::Active);
        assert_eq!(fx.replay.len(), 1);
        let record = fx.replay.iter().next().unwrap();
        assert_eq!(record.reward, 100.0);
        assert_eq!(record.action, 0);
        assert_eq!(record.state.len(), 4);
        assert!(!record.done);
        assert_eq!(record.priority, None);
    }

    #[test]
    fn task_state_and_assign_label_are_used() {
        let mut fx = Fixture::new(true);
        fx.agents
            .register_agent(AgentDefinition::new("a1", ["x"]))
            .unwrap();
        let sub = TaskSubmission::new(6, ["x"], 5.0, Utc::now())
            .with_id("t1")
            .with_state(vec![0.1, 0.2, 0.3, 0.4])
            .with_action_labels(["skip", "ASSIGN"]);
        fx.tasks.submit_task(sub).unwrap();
        fx.allocate("t1");

        let record = fx.replay.iter().next().unwrap();
        assert_eq!(record.state, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(record.action, 1);
        assert!((record.priority.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn reallocation_is_a_no_op() {
        let mut fx = Fixture::new(false);
        fx.agents
            .register_agent(AgentDefinition::new("a1", ["x"]))
            .unwrap();
        fx.submit("t1", &["x"]);
        fx.allocate("t1");

        let again = fx.allocate("t1");
        assert_eq!(
            again,
            AllocationOutcome::Unchanged {
                task_id: "t1".into(),
                status: TaskStatus::Assigned
            }
        );
        assert_eq!(fx.replay.len(), 1);
    }

    #[test]
    fn allocating_a_completed_task_changes_nothing() {
        let mut fx = Fixture::new(false);
        fx.agents
            .register_agent(AgentDefinition::new("a1", ["x"]))
            .unwrap();
        fx.submit("t1", &["x"]);
        assert!(fx.allocate("t1").is_assigned());
        fx.tasks.mark_started("t1").unwrap();
        fx.tasks.complete("t1", TaskOutcome::Completed).unwrap();

        let again = fx.allocate("t1");
        assert_eq!(
            again,
            AllocationOutcome::Unchanged {
                task_id: "t1".into(),
                status: TaskStatus::Completed
            }
        );
        assert_eq!(fx.replay.len(), 1);
        assert_eq!(fx.tasks.get("t1").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn unknown_task_is_a_validation_error() {
        let mut fx = Fixture::new(false);
        let err = fx
            .allocator
            .allocate(
                "ghost",
                &mut fx.agents,
                &mut fx.tasks,
                &mut fx.replay,
                &mut fx.trainer,
            )
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Validation(_)));
    }

    #[test]
    fn non_finite_scores_are_skipped() {
        struct NanScorer;
        impl ScoringStrategy for NanScorer {
            fn score(&self, agent: &Agent, _task: &Task) -> f64 {
                if agent.id == "a" {
                    f64::NAN
                } else {
                    1.0
                }
            }
            fn name(&self) -> &str {
                "nan"
            }
        }

        let allocator = Allocator::new(Box::new(NanScorer), 2, false);
        let mut agents = AgentRegistry::new(4);
        agents.register_agent(AgentDefinition::new("a", ["x"])).unwrap();
        agents.register_agent(AgentDefinition::new("b", ["x"])).unwrap();
        let mut tasks = TaskQueue::new(2);
        let task = tasks
            .submit_task(TaskSubmission::new(5, ["x"], 1.0, Utc::now()))
            .unwrap();

        let candidates = agents.list_available();
        let (chosen, _) = allocator.select(&candidates, &task).unwrap();
        assert_eq!(chosen.id, "b");
    }
}
