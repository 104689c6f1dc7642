//! Background tick loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::engine::Engine;
use crate::error::{CoordinatorError, Result};

struct Running {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives [`Engine::tick`] on a fixed interval from a tokio task.
///
/// The task is aborted if the scheduler is dropped while running.
pub struct TickScheduler {
    period: Duration,
    running: Option<Running>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawns the tick loop. Returns `false` if it was already running.
    ///
    /// # Errors
    ///
    /// `ConcurrencyError` when called outside a tokio runtime.
    pub fn start(&mut self, engine: Arc<Engine>) -> Result<bool> {
        if self.is_running() {
            return Ok(false);
        }
        let runtime = Handle::try_current()
            .map_err(|e| CoordinatorError::Concurrency(format!("no tokio runtime: {}", e)))?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.period;
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match engine.tick() {
                            Ok(summary) => debug!(
                                allocations = summary.allocations.len(),
                                target_syncs = summary.target_syncs,
                                "Scheduler tick"
                            ),
                            Err(e) => error!(error = %e, "Scheduler tick failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
        });

        self.running = Some(Running {
            shutdown_tx,
            handle,
        });
        info!(period_ms = period.as_millis() as u64, "Tick scheduler started");
        Ok(true)
    }

    /// Signals the loop to stop and waits for it. Returns `false` if it was
    /// not running.
    ///
    /// A tick already in progress finishes before this returns.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Tick scheduler task ended abnormally");
            }
        }
        info!("Tick scheduler stopped");
        true
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
