//! Configuration loading and typed config structures for the junction
//! controller.
//!
//! The configuration lives in `junction-config.yaml` in the working
//! directory. Every field has a default matching the reference timing
//! (4 s cycle, 1.5 s crossing, 1 s yellow), so an absent file or an empty
//! document yields a runnable single-junction setup.

use std::path::Path;

use junction_types::{InvalidJunctionIdError, JunctionId};
use serde::Deserialize;

/// Environment variable overriding [`ObserverConfig::port`].
pub const OBSERVER_PORT_ENV: &str = "JUNCTION_OBSERVER_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A configured junction id is not a valid label.
    #[error("invalid junction id in config: {source}")]
    JunctionId {
        /// The underlying validation error.
        #[from]
        source: InvalidJunctionIdError,
    },

    /// The configuration is structurally valid but semantically wrong.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
///
/// Mirrors the structure of `junction-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JunctionConfig {
    /// Labels of the junctions to schedule.
    #[serde(default = "default_junctions")]
    pub junctions: Vec<String>,

    /// Base durations of the scheduling cycle and phases.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Initial values of the runtime controls.
    #[serde(default)]
    pub control: ControlConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            junctions: default_junctions(),
            timing: TimingConfig::default(),
            control: ControlConfig::default(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl JunctionConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `JUNCTION_OBSERVER_PORT` overrides `observer.port` when set to a
    /// valid port number.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }

    /// Validate the configured labels and return them as junction ids.
    ///
    /// Fails when the list is empty or a label repeats.
    pub fn junction_ids(&self) -> Result<Vec<JunctionId>, ConfigError> {
        if self.junctions.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "at least one junction must be configured".to_owned(),
            });
        }
        let mut ids: Vec<JunctionId> = Vec::with_capacity(self.junctions.len());
        for label in &self.junctions {
            let id = JunctionId::new(label)?;
            if ids.contains(&id) {
                return Err(ConfigError::Invalid {
                    reason: format!("junction {id} is configured twice"),
                });
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Base durations, in milliseconds at speed 1.0.
///
/// `cycle_interval_ms`, `vehicle_process_ms` and `yellow_light_ms` are
/// divided by the speed multiplier when a delay is scheduled. The service
/// buffer and the cleared-lane display delay are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Scheduler tick period.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Time a vehicle spends crossing while shown as passing.
    #[serde(default = "default_vehicle_process_ms")]
    pub vehicle_process_ms: u64,

    /// Yellow clearance interval before reverting to red.
    #[serde(default = "default_yellow_light_ms")]
    pub yellow_light_ms: u64,

    /// Extra green time of a normal episode on top of the crossing time.
    #[serde(default = "default_service_buffer_ms")]
    pub service_buffer_ms: u64,

    /// How long a finished clearance stays flagged on the lane.
    #[serde(default = "default_cleared_display_ms")]
    pub cleared_display_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            vehicle_process_ms: default_vehicle_process_ms(),
            yellow_light_ms: default_yellow_light_ms(),
            service_buffer_ms: default_service_buffer_ms(),
            cleared_display_ms: default_cleared_display_ms(),
        }
    }
}

/// Initial values of the runtime controls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlConfig {
    /// Minimum queue length that makes a non-emergency lane eligible.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Simulation speed multiplier.
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    /// Whether the scheduler starts paused.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            speed_multiplier: default_speed_multiplier(),
            start_paused: false,
        }
    }
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

impl ObserverConfig {
    /// Apply the `JUNCTION_OBSERVER_PORT` override, ignoring unparsable values.
    fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var(OBSERVER_PORT_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<u16>().ok())
        {
            self.port = port;
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error) when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_junctions() -> Vec<String> {
    vec!["A".to_owned()]
}

const fn default_cycle_interval_ms() -> u64 {
    4000
}

const fn default_vehicle_process_ms() -> u64 {
    1500
}

const fn default_yellow_light_ms() -> u64 {
    1000
}

const fn default_service_buffer_ms() -> u64 {
    500
}

const fn default_cleared_display_ms() -> u64 {
    2000
}

const fn default_block_size() -> usize {
    3
}

const fn default_speed_multiplier() -> f64 {
    1.0
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
