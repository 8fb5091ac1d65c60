//! Junction engine binary.
//!
//! Wires the junction registry, the operator controls, the Observer API
//! and the scheduler loop together, then runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `junction-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build one controller per configured junction
//! 4. Start the Observer API server on a background task
//! 5. Run the scheduler loop until Ctrl-C
//! 6. Log the result

mod error;

use std::path::Path;
use std::sync::Arc;

use junction_core::config::JunctionConfig;
use junction_core::registry::JunctionRegistry;
use junction_core::runner;
use junction_observer::server::ServerConfig;
use junction_observer::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "junction-config.yaml";

/// Application entry point for the junction engine.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging. `RUST_LOG` wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        from_file,
        junctions = config.junctions.len(),
        block_size = config.control.block_size,
        speed_multiplier = config.control.speed_multiplier,
        "Configuration loaded"
    );

    // 3. Build the registry.
    let registry = Arc::new(JunctionRegistry::from_config(&config)?);
    let operator = Arc::clone(registry.operator());
    info!(
        junctions = ?registry.ids().map(ToString::to_string).collect::<Vec<_>>(),
        "Junction controllers initialized"
    );

    // 4. Start the Observer API server.
    let server_config = ServerConfig::from(&config.observer);
    let app_state = Arc::new(AppState::new(Arc::clone(&registry)));
    let observer_handle = junction_observer::startup::spawn_observer(server_config, app_state)?;

    // 5. Run the scheduler until Ctrl-C.
    let scheduler = tokio::spawn(runner::run_scheduler(Arc::clone(&registry)));
    let signal = tokio::signal::ctrl_c().await;
    operator.request_stop();
    let summary = scheduler.await.unwrap_or_default();
    observer_handle.abort();

    // 6. Log results.
    runner::log_scheduler_end(&summary);
    signal.map_err(|e| EngineError::Signal {
        message: format!("{e}"),
    })?;

    info!("junction-engine shutdown complete");
    Ok(())
}

/// Load `junction-config.yaml` from the working directory.
///
/// Returns the defaults when the file does not exist. The flag reports
/// whether the file was read.
fn load_config() -> Result<(JunctionConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok((JunctionConfig::from_file(config_path)?, true))
    } else {
        Ok((JunctionConfig::default(), false))
    }
}
