//! Thread-safe coordination engine.

use std::fmt;
use std::sync::Mutex;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::agents::{Agent, AgentDefinition, AgentEstimates, AgentRegistry};
use crate::allocation::{Allocator, ScoringStrategy};
use crate::config::RLConfig;
use crate::error::{AllocationOutcome, CoordinatorError, Result};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::network::{NetworkPairManager, NetworkPairSnapshot, TrainingStepOutcome};
use crate::replay::{ReplayBufferStats, ReplayMemory, TransitionRecord};
use crate::tasks::{Task, TaskQueue, TaskSubmission};
use crate::trainer::{EpisodeReport, Trainer};
use crate::types::{AgentStatus, TaskOutcome};

/// What one scheduler tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub episode: EpisodeReport,
    /// Training steps recorded across all network pairs.
    pub training_steps: usize,
    /// Target syncs triggered by those steps.
    pub target_syncs: usize,
    pub allocations: Vec<AllocationOutcome>,
}

/// Owns every component and serializes access to each of them.
///
/// All methods take `&self`, so an `Arc<Engine>` can be shared between the
/// scheduler tick and any number of caller threads.
///
/// # Lock order
///
/// agents → tasks → replay → networks → metrics → trainer. Every method that
/// holds more than one lock acquires them in this order.
pub struct Engine {
    config: RLConfig,
    allocator: Allocator,
    agents: Mutex<AgentRegistry>,
    tasks: Mutex<TaskQueue>,
    replay: Mutex<ReplayMemory>,
    networks: Mutex<NetworkPairManager>,
    metrics: Mutex<MetricsAggregator>,
    trainer: Mutex<Box<dyn Trainer>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Builds an engine after validating the configuration.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for any out-of-range configuration value.
    pub fn new(
        config: RLConfig,
        strategy: Box<dyn ScoringStrategy>,
        trainer: Box<dyn Trainer>,
    ) -> Result<Self> {
        config.validate()?;
        let replay = ReplayMemory::new(config.memory_size, config.replay_mode())?;
        let networks =
            NetworkPairManager::new(config.target_network_update_freq, config.parameter_count)?;
        let allocator = Allocator::new(
            strategy,
            config.state_dim,
            config.prioritized_replay_enabled,
        );

        Ok(Self {
            allocator,
            agents: Mutex::new(AgentRegistry::new(config.q_value_dim)),
            tasks: Mutex::new(TaskQueue::new(config.state_dim)),
            replay: Mutex::new(replay),
            networks: Mutex::new(networks),
            metrics: Mutex::new(MetricsAggregator::new(config.metrics_config())),
            trainer: Mutex::new(trainer),
            config,
        })
    }

    pub fn config(&self) -> &RLConfig {
        &self.config
    }

    // --- Agents ---

    /// Registers an agent and, with DQN enabled, its network pair.
    pub fn register_agent(&self, definition: AgentDefinition) -> Result<Agent> {
        let mut agents = self.agents.lock()?;
        let agent = agents.register_agent(definition)?;
        if !self.config.dqn_enabled {
            return Ok(agent);
        }
        let pair_id = self.networks.lock()?.create_pair(&agent.id);
        agents.attach_network_pair(&agent.id, pair_id)?;
        agents.get(&agent.id).ok_or_else(|| {
            CoordinatorError::Concurrency(format!(
                "agent {} vanished during registration",
                agent.id
            ))
        })
    }

    /// Removes an agent and its network pair.
    ///
    /// Tasks already assigned to the agent keep their status.
    pub fn unregister_agent(&self, id: &str) -> Result<Agent> {
        let mut agents = self.agents.lock()?;
        let tasks = self.tasks.lock()?;
        let agent = agents.unregister_agent(id)?;
        let open = tasks.open_tasks_for(id);
        if open > 0 {
            warn!(agent_id = %id, open_tasks = open, "Unregistered agent still holds tasks");
        }
        self.networks.lock()?.remove_pair(id);
        Ok(agent)
    }

    pub fn update_agent_estimates(&self, id: &str, estimates: AgentEstimates) -> Result<()> {
        self.agents.lock()?.update_estimates(id, estimates)
    }

    pub fn set_agent_status(&self, id: &str, status: AgentStatus) -> Result<AgentStatus> {
        self.agents.lock()?.set_status(id, status)
    }

    // --- Tasks ---

    pub fn submit_task(&self, submission: TaskSubmission) -> Result<Task> {
        self.tasks.lock()?.submit_task(submission)
    }

    /// Submits a task and immediately tries to allocate it.
    pub fn submit_and_allocate(&self, submission: TaskSubmission) -> Result<AllocationOutcome> {
        let task = self.submit_task(submission)?;
        self.allocate(&task.id)
    }

    /// Allocates one task. See [`Allocator::allocate`].
    pub fn allocate(&self, task_id: &str) -> Result<AllocationOutcome> {
        let mut agents = self.agents.lock()?;
        let mut tasks = self.tasks.lock()?;
        let mut replay = self.replay.lock()?;
        let mut metrics = self.metrics.lock()?;
        let mut trainer = self.trainer.lock()?;

        let outcome = self.allocator.allocate(
            task_id,
            &mut agents,
            &mut tasks,
            &mut replay,
            trainer.as_mut(),
        )?;
        metrics.set_replay_size(replay.len());
        Ok(outcome)
    }

    /// Allocates every pending task in priority order.
    pub fn allocate_pending(&self) -> Result<Vec<AllocationOutcome>> {
        let mut agents = self.agents.lock()?;
        let mut tasks = self.tasks.lock()?;
        let mut replay = self.replay.lock()?;
        let mut metrics = self.metrics.lock()?;
        let mut trainer = self.trainer.lock()?;

        let pending = tasks.pending_tasks();
        let mut outcomes = Vec::with_capacity(pending.len());
        for task in pending {
            outcomes.push(self.allocator.allocate(
                &task.id,
                &mut agents,
                &mut tasks,
                &mut replay,
                trainer.as_mut(),
            )?);
        }
        metrics.set_replay_size(replay.len());
        Ok(outcomes)
    }

    /// External signal: an assigned task has started.
    pub fn mark_task_started(&self, task_id: &str) -> Result<Task> {
        self.tasks.lock()?.mark_started(task_id)
    }

    /// External signal: an in-progress task finished.
    ///
    /// The task is archived, the outcome feeds the success rate, and an
    /// `Active` agent with no remaining tasks returns to `Idle`.
    pub fn complete_task(&self, task_id: &str, outcome: TaskOutcome) -> Result<Task> {
        let mut agents = self.agents.lock()?;
        let mut tasks = self.tasks.lock()?;
        let task = tasks.complete(task_id, outcome)?;

        if let Some(agent_id) = task.assigned_agent.as_deref() {
            let idle = tasks.open_tasks_for(agent_id) == 0
                && agents
                    .get(agent_id)
                    .is_some_and(|a| a.status == AgentStatus::Active);
            if idle {
                agents.set_status(agent_id, AgentStatus::Idle)?;
            }
        }

        self.metrics.lock()?.record_task_outcome(outcome);
        Ok(task)
    }

    // --- Training ---

    /// External trainer report: one training step for `agent_id`.
    pub fn report_training_step(&self, agent_id: &str, loss: f64) -> Result<TrainingStepOutcome> {
        let mut networks = self.networks.lock()?;
        let mut metrics = self.metrics.lock()?;
        let outcome = networks.record_training_step(agent_id, loss)?;
        metrics.record_training_step(loss);
        if outcome.synced {
            metrics.record_target_sync();
        }
        Ok(outcome)
    }

    /// External trainer report: new main parameters for `agent_id`.
    pub fn publish_main_parameters(&self, agent_id: &str, values: Vec<f64>) -> Result<()> {
        self.networks.lock()?.update_main(agent_id, values)
    }

    /// Draws `n` replay records using the caller's RNG.
    pub fn sample_replay<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<TransitionRecord>> {
        Ok(self.replay.lock()?.sample_batch(n, rng))
    }

    /// Draws one batch of the configured size.
    pub fn sample_batch<R: Rng>(&self, rng: &mut R) -> Result<Vec<TransitionRecord>> {
        self.sample_replay(self.config.batch_size, rng)
    }

    /// Runs one scheduler step.
    ///
    /// 1. Records one trainer episode (decaying exploration).
    /// 2. With DQN enabled, trains every network pair once.
    /// 3. Allocates all pending tasks.
    pub fn tick(&self) -> Result<TickSummary> {
        let episode = self.trainer.lock()?.run_episode();
        self.metrics
            .lock()?
            .record_episode(episode.reward, episode.steps);

        let (training_steps, target_syncs) = if self.config.dqn_enabled {
            self.train_all_pairs()?
        } else {
            (0, 0)
        };

        let allocations = self.allocate_pending()?;
        debug!(
            reward = episode.reward,
            steps = episode.steps,
            training_steps,
            target_syncs,
            allocated = allocations.iter().filter(|a| a.is_assigned()).count(),
            "Tick complete"
        );
        Ok(TickSummary {
            episode,
            training_steps,
            target_syncs,
            allocations,
        })
    }

    fn train_all_pairs(&self) -> Result<(usize, usize)> {
        let mut networks = self.networks.lock()?;
        let mut metrics = self.metrics.lock()?;
        let mut trainer = self.trainer.lock()?;

        let mut steps = 0;
        let mut syncs = 0;
        for agent_id in networks.agent_ids() {
            let main = match networks.get(&agent_id) {
                Some(pair) => pair.main().values().to_vec(),
                None => continue,
            };
            let update = trainer.train_step(&agent_id, &main);
            if let Some(parameters) = update.parameters {
                if let Err(e) = networks.update_main(&agent_id, parameters) {
                    warn!(agent_id = %agent_id, error = %e, "Trainer produced unusable parameters");
                }
            }
            match networks.record_training_step(&agent_id, update.loss) {
                Ok(outcome) => {
                    steps += 1;
                    metrics.record_training_step(update.loss);
                    if outcome.synced {
                        syncs += 1;
                        metrics.record_target_sync();
                    }
                }
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "Trainer reported an invalid loss");
                }
            }
        }
        Ok((steps, syncs))
    }

    /// Clears replay memory and resets metrics to their initial configuration.
    ///
    /// Agents, tasks and network pairs are kept.
    pub fn reset_state(&self) -> Result<()> {
        let mut replay = self.replay.lock()?;
        let mut metrics = self.metrics.lock()?;
        replay.clear();
        metrics.reset();
        info!("Replay memory and metrics reset");
        Ok(())
    }

    // --- Snapshots ---

    pub fn agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.lock()?.get(id))
    }

    pub fn agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.lock()?.agents())
    }

    pub fn available_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.lock()?.list_available())
    }

    pub fn task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.lock()?.get(id))
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.lock()?.tasks())
    }

    pub fn pending_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.lock()?.pending_tasks())
    }

    pub fn metrics(&self) -> Result<MetricsSnapshot> {
        let replay = self.replay.lock()?;
        let mut snapshot = self.metrics.lock()?.snapshot();
        snapshot.replay_size = replay.len();
        Ok(snapshot)
    }

    /// True once the convergence rate reaches `convergence_target`.
    pub fn is_converged(&self) -> Result<bool> {
        Ok(self.metrics.lock()?.is_converged())
    }

    pub fn replay_stats(&self) -> Result<ReplayBufferStats> {
        Ok(self.replay.lock()?.stats())
    }

    /// Replay records from oldest to newest.
    pub fn replay_records(&self) -> Result<Vec<TransitionRecord>> {
        Ok(self.replay.lock()?.iter().cloned().collect())
    }

    pub fn network_pairs(&self) -> Result<Vec<NetworkPairSnapshot>> {
        Ok(self.networks.lock()?.snapshots())
    }

    pub fn network_pair(&self, agent_id: &str) -> Result<Option<NetworkPairSnapshot>> {
        Ok(self.networks.lock()?.get(agent_id).cloned())
    }
}
