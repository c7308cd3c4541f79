//! Background catalog refresh

use crate::lifecycle::LifecycleOrchestrator;
use std::time::Duration;
use stencil_core::types::UnitType;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Periodically runs `refresh_if_stale` for a set of unit types.
///
/// The task is aborted when the scheduler is stopped or dropped.
pub struct RefreshScheduler {
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Start ticking immediately, then every `interval`
    pub fn spawn(
        orchestrator: LifecycleOrchestrator,
        unit_types: Vec<UnitType>,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "Refreshing {} unit types every {:?}",
                unit_types.len(),
                interval
            );

            loop {
                ticker.tick().await;
                let max_age = orchestrator.settings().refresh_ttl;
                for unit_type in &unit_types {
                    let outcome = orchestrator.refresh_if_stale(*unit_type, max_age).await;
                    debug!("Scheduled refresh of {} ok={}", unit_type, outcome.is_ok());
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
