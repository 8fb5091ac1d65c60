//! Phase timing: base durations and their scaling by the speed multiplier.
//!
//! Three base durations drive the controller: the scheduler cycle, the
//! crossing time of one vehicle, and the yellow interval. Each is divided by
//! the speed multiplier read at the moment a delay is scheduled, so a speed
//! change never alters a delay that is already running. The normal-episode
//! green buffer and the cleared-lane display delay are fixed.

use std::time::Duration;

use crate::config::TimingConfig;

/// Base durations of the scheduling cycle and of an episode's phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    cycle_interval: Duration,
    vehicle_process: Duration,
    yellow_light: Duration,
    service_buffer: Duration,
    cleared_display: Duration,
}

impl PhaseTiming {
    /// Build the timing table from configuration.
    pub const fn from_config(config: &TimingConfig) -> Self {
        Self {
            cycle_interval: Duration::from_millis(config.cycle_interval_ms),
            vehicle_process: Duration::from_millis(config.vehicle_process_ms),
            yellow_light: Duration::from_millis(config.yellow_light_ms),
            service_buffer: Duration::from_millis(config.service_buffer_ms),
            cleared_display: Duration::from_millis(config.cleared_display_ms),
        }
    }

    /// Scheduler tick period at the given speed.
    pub fn cycle_interval(&self, speed: f64) -> Duration {
        scale(self.cycle_interval, speed)
    }

    /// Crossing time of one vehicle at the given speed.
    pub fn vehicle_process(&self, speed: f64) -> Duration {
        scale(self.vehicle_process, speed)
    }

    /// Yellow interval at the given speed.
    pub fn yellow_light(&self, speed: f64) -> Duration {
        scale(self.yellow_light, speed)
    }

    /// Green hold of a normal episode: the scaled crossing time plus the
    /// fixed service buffer.
    pub fn service_green(&self, speed: f64) -> Duration {
        self.vehicle_process(speed)
            .saturating_add(self.service_buffer)
    }

    /// Fixed time a finished clearance stays flagged on its lane.
    pub const fn cleared_display(&self) -> Duration {
        self.cleared_display
    }
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self::from_config(&TimingConfig::default())
    }
}

/// Divide `base` by `speed`.
///
/// Non-positive or non-finite speeds, and results that do not fit a
/// [`Duration`], leave the base duration unchanged.
fn scale(base: Duration, speed: f64) -> Duration {
    if !speed.is_finite() || speed <= 0.0 {
        return base;
    }
    Duration::try_from_secs_f64(base.as_secs_f64() / speed).unwrap_or(base)
}
