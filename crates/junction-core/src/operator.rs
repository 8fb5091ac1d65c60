//! Operator control state for runtime junction management.
//!
//! This module provides the shared control plane used by the scheduler
//! loop, the phase controller and the observer API: pause/resume, speed
//! multiplier, block size, and a clean stop request.
//!
//! # Architecture
//!
//! All mutable control fields are atomics so they can be shared through
//! [`Arc`](std::sync::Arc) between the scheduler task, episode tasks and
//! HTTP handler tasks without locks. Values are read at decision time: a
//! block-size change applies from the next tick, a speed change applies
//! to the next delay scheduled.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::config::ControlConfig;

/// Smallest accepted block size.
pub const MIN_BLOCK_SIZE: usize = 1;

/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 8;

/// Slowest accepted speed multiplier.
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;

/// Fastest accepted speed multiplier.
pub const MAX_SPEED_MULTIPLIER: f64 = 10.0;

/// Errors returned by control operations. Rejected values leave the
/// previous setting in place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    /// Block size outside `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`.
    #[error("block size {value} is outside {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}")]
    InvalidBlockSize {
        /// The rejected value.
        value: usize,
    },

    /// Speed multiplier not finite or outside
    /// `MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER`.
    #[error("speed multiplier {value} is outside {MIN_SPEED_MULTIPLIER}..={MAX_SPEED_MULTIPLIER}")]
    InvalidSpeed {
        /// The rejected value.
        value: f64,
    },
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether scheduler ticks are suppressed.
    paused: AtomicBool,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the scheduler loop when a stop is requested.
    stop_notify: Notify,

    /// Speed multiplier stored as `f64` bits.
    speed_bits: AtomicU64,

    /// Minimum queue length for a non-emergency lane to be eligible.
    block_size: AtomicUsize,

    /// Wall-clock time the control plane was created.
    started_at: DateTime<Utc>,
}

impl OperatorState {
    /// Create the control state from configuration.
    pub fn new(config: &ControlConfig) -> Result<Self, ControlError> {
        validate_block_size(config.block_size)?;
        validate_speed(config.speed_multiplier)?;
        Ok(Self {
            paused: AtomicBool::new(config.start_paused),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            speed_bits: AtomicU64::new(config.speed_multiplier.to_bits()),
            block_size: AtomicUsize::new(config.block_size),
            started_at: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether scheduler ticks are suppressed.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause or resume the scheduler. Episodes already in flight always
    /// run to completion.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Suppress scheduler ticks.
    pub fn pause(&self) {
        self.set_paused(true);
    }

    /// Let scheduler ticks run again.
    pub fn resume(&self) {
        self.set_paused(false);
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Current speed multiplier.
    pub fn speed_multiplier(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::Acquire))
    }

    /// Set the speed multiplier. Returns the previous value.
    pub fn set_speed_multiplier(&self, multiplier: f64) -> Result<f64, ControlError> {
        validate_speed(multiplier)?;
        let prev = self.speed_bits.swap(multiplier.to_bits(), Ordering::AcqRel);
        Ok(f64::from_bits(prev))
    }

    // -----------------------------------------------------------------------
    // Block size
    // -----------------------------------------------------------------------

    /// Current block size.
    pub fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Acquire)
    }

    /// Set the block size. Returns the previous value.
    pub fn set_block_size(&self, block_size: usize) -> Result<usize, ControlError> {
        validate_block_size(block_size)?;
        Ok(self.block_size.swap(block_size, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop of the scheduler loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        loop {
            // Register before checking the flag so a concurrent request is not missed.
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at())
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// JSON-serializable view of the current controls.
    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            speed_multiplier: self.speed_multiplier(),
            block_size: self.block_size(),
            elapsed_seconds: self.elapsed_seconds(),
            started_at: self.started_at().to_rfc3339(),
        }
    }
}

/// JSON-serializable status of the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStatus {
    /// Whether scheduler ticks are suppressed.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current speed multiplier.
    pub speed_multiplier: f64,
    /// Current block size.
    pub block_size: usize,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// ISO 8601 start timestamp.
    pub started_at: String,
}

fn validate_block_size(value: usize) -> Result<(), ControlError> {
    if (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&value) {
        Ok(())
    } else {
        Err(ControlError::InvalidBlockSize { value })
    }
}

fn validate_speed(value: f64) -> Result<(), ControlError> {
    if value.is_finite() && (MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER).contains(&value) {
        Ok(())
    } else {
        Err(ControlError::InvalidSpeed { value })
    }
}
