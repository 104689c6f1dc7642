//! Coordinator demo: three agents, a stream of tasks, and a few seconds of
//! background ticking.
//!
//! Run:
//! ```sh
//! RUST_LOG=rl_coordinator=debug cargo run --example coordinator_demo
//! ```

use std::time::Duration;

use chrono::Utc;
use rl_coordinator::{
    AgentDefinition, AllocationOutcome, Coordinator, RLConfig, TaskOutcome, TaskStatus,
    TaskSubmission,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rl_coordinator::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== RL Task Coordinator Demo ===\n");

    let config = RLConfig {
        tick_interval: Duration::from_millis(100),
        target_network_update_freq: 5,
        prioritized_replay_enabled: true,
        memory_size: 256,
        ..RLConfig::default()
    };
    let mut coordinator = Coordinator::new(config)?;
    let engine = coordinator.engine().clone();

    engine.register_agent(
        AgentDefinition::new("planner", ["planning", "analysis"])
            .with_performance(85.0)
            .with_confidence(80.0),
    )?;
    engine.register_agent(
        AgentDefinition::new("builder", ["coding", "testing"])
            .with_performance(70.0)
            .with_confidence(65.0),
    )?;
    engine.register_agent(AgentDefinition::new("reviewer", ["testing", "analysis"]))?;

    println!("Agents:");
    for agent in engine.agents()? {
        println!(
            "  {:<10} skills={:?} perf={} status={}",
            agent.id, agent.capabilities, agent.performance, agent.status
        );
    }
    println!();

    let skills = ["planning", "coding", "testing", "analysis"];
    for (i, skill) in skills.iter().cycle().take(8).enumerate() {
        let priority = (i % 10) as u8 + 1;
        let submission = TaskSubmission::new(priority, [*skill], 10.0 * priority as f64, Utc::now())
            .with_id(format!("task-{}", i));
        match engine.submit_and_allocate(submission)? {
            AllocationOutcome::Assigned {
                task_id,
                agent_id,
                score,
            } => println!("  {} -> {} (score {:.2})", task_id, agent_id, score),
            other => println!("  {}: {:?}", other.task_id(), other),
        }
    }
    println!();

    coordinator.start()?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Odd priorities fail.
    for task in engine.tasks()? {
        if task.status == TaskStatus::Assigned {
            engine.mark_task_started(&task.id)?;
            let outcome = if task.priority % 2 == 0 {
                TaskOutcome::Completed
            } else {
                TaskOutcome::Failed
            };
            engine.complete_task(&task.id, outcome)?;
        }
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    coordinator.pause().await;

    println!("{}", engine.metrics()?);
    println!("Replay: {:?}", engine.replay_stats()?);
    for pair in engine.network_pairs()? {
        println!(
            "  pair {} agent={} steps={} last_sync={} loss={:.4}",
            pair.id(),
            pair.agent_id(),
            pair.training_steps(),
            pair.last_sync_step(),
            pair.average_loss()
        );
    }

    coordinator.reset()?;
    println!("\nAfter reset: {} episodes", engine.metrics()?.episode_count);
    Ok(())
}
