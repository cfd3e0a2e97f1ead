//! Ticker that drives the learning engine's periodic sweeps.
//!
//! Owns two independent cadences: the fast pattern sweep and the slow
//! persistence flush. Both run beside foreground request processing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::LearningEngine;

/// Background driver for [`LearningEngine`] sweeps.
pub struct LearningScheduler {
    engine: Arc<LearningEngine>,
    sweep_every: Duration,
    persist_every: Duration,
    shutdown: Arc<Notify>,
}

impl LearningScheduler {
    /// Create a scheduler using the engine's configured cadences.
    pub fn new(engine: Arc<LearningEngine>) -> Self {
        let sweep_every = Duration::from_secs(engine.config().sweep_interval_secs.max(1));
        let persist_every = Duration::from_secs(engine.config().persist_interval_secs.max(1));
        Self {
            engine,
            sweep_every,
            persist_every,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run both sweeps until [`shutdown`](Self::shutdown) is called.
    ///
    /// On shutdown one last pattern sweep and persistence flush run before
    /// returning.
    pub async fn run(&self) {
        let mut sweep = tokio::time::interval(self.sweep_every);
        let mut persist = tokio::time::interval(self.persist_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        persist.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Both intervals fire immediately; skip that first tick.
        sweep.tick().await;
        persist.tick().await;

        info!(
            sweep_secs = self.sweep_every.as_secs(),
            persist_secs = self.persist_every.as_secs(),
            "Learning scheduler started"
        );

        loop {
            tokio::select! {
                _ = sweep.tick() => {
                    let report = self.engine.run_pattern_sweep();
                    if report.failed > 0 {
                        warn!(failed = report.failed, "Pattern sweep skipped interactions");
                    }
                }
                _ = persist.tick() => {
                    let report = self.engine.run_persistence_sweep().await;
                    if !report.is_success() {
                        debug!("Persistence will be retried next cycle");
                    }
                }
                _ = self.shutdown.notified() => {
                    self.engine.run_pattern_sweep();
                    let report = self.engine.persist_now().await;
                    info!(
                        persisted = report.is_success(),
                        patterns = report.patterns,
                        "Learning scheduler stopped"
                    );
                    return;
                }
            }
        }
    }

    /// Signal the scheduler to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
