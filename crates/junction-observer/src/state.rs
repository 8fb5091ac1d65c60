//! Shared application state for the Observer API server.

use std::sync::Arc;

use junction_core::operator::OperatorState;
use junction_core::registry::JunctionRegistry;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// All junctions plus the shared control plane.
    pub registry: Arc<JunctionRegistry>,
}

impl AppState {
    /// Wrap the registry the engine schedules.
    pub const fn new(registry: Arc<JunctionRegistry>) -> Self {
        Self { registry }
    }

    /// Shared operator controls.
    pub fn operator(&self) -> &OperatorState {
        self.registry.operator()
    }
}
