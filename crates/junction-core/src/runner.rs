//! Scheduler loop with operator controls.
//!
//! [`run_scheduler`] ticks every junction once per cycle interval until a
//! stop is requested. The interval is read from the current speed
//! multiplier before every sleep, and the first tick fires one interval
//! after start. A paused operator turns each tick into a no-op without
//! stopping the loop, so resuming takes effect on the next cycle.

use std::sync::Arc;

use tracing::{debug, info};

use crate::controller::TickOutcome;
use crate::registry::JunctionRegistry;

/// Result of a scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerSummary {
    /// Scheduler cycles completed.
    pub cycles: u64,
    /// Episodes started across all junctions.
    pub episodes_started: u64,
    /// Of which full emergency clearances.
    pub emergency_clearances: u64,
}

/// Run the scheduler loop until the operator requests a stop.
pub async fn run_scheduler(registry: Arc<JunctionRegistry>) -> SchedulerSummary {
    let operator = Arc::clone(registry.operator());
    let mut summary = SchedulerSummary::default();

    info!(
        junctions = registry.ids().count(),
        block_size = operator.block_size(),
        speed = operator.speed_multiplier(),
        paused = operator.is_paused(),
        "Scheduler starting"
    );

    loop {
        let interval = registry
            .timing()
            .cycle_interval(operator.speed_multiplier());

        tokio::select! {
            () = operator.stopped() => {
                info!("Operator stop requested");
                return summary;
            }
            () = tokio::time::sleep(interval) => {}
        }

        summary.cycles = summary.cycles.saturating_add(1);
        for (junction, outcome) in registry.tick_all().await {
            match outcome {
                TickOutcome::EmergencyStarted(_) => {
                    summary.episodes_started = summary.episodes_started.saturating_add(1);
                    summary.emergency_clearances = summary.emergency_clearances.saturating_add(1);
                }
                TickOutcome::ServiceStarted(_) => {
                    summary.episodes_started = summary.episodes_started.saturating_add(1);
                }
                TickOutcome::Paused
                | TickOutcome::Busy
                | TickOutcome::Idle
                | TickOutcome::Waiting => {}
            }
            debug!(cycle = summary.cycles, %junction, ?outcome, "Tick evaluated");
        }
    }
}

/// Log the end of a scheduler run.
pub fn log_scheduler_end(summary: &SchedulerSummary) {
    info!(
        cycles = summary.cycles,
        episodes_started = summary.episodes_started,
        emergency_clearances = summary.emergency_clearances,
        "Scheduler stopped"
    );
}
