//! Junction registry: the ingestion and control API over every configured
//! junction.
//!
//! Junctions are scheduled independently, each behind its own
//! [`JunctionController`]. The operator controls (pause, speed, block
//! size) are shared by all of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use junction_types::{
    InvalidJunctionIdError, InvalidLaneError, InvalidVehicleCategoryError, JunctionId,
    JunctionSnapshot, LaneId, VehicleCategory, VehicleId,
};
use tracing::info;

use crate::config::{ConfigError, JunctionConfig};
use crate::controller::{JunctionController, TickOutcome};
use crate::operator::{ControlError, OperatorState};
use crate::timing::PhaseTiming;

/// Errors returned by ingestion and observation calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JunctionError {
    /// No junction is registered under the id.
    #[error("unknown junction: {id}")]
    UnknownJunction {
        /// The requested id.
        id: String,
    },

    /// The lane name is not one of the four lanes.
    #[error(transparent)]
    InvalidLane(#[from] InvalidLaneError),

    /// The category name is not a known vehicle category.
    #[error(transparent)]
    InvalidCategory(#[from] InvalidVehicleCategoryError),

    /// The junction id is not a valid label.
    #[error(transparent)]
    InvalidJunctionId(#[from] InvalidJunctionIdError),
}

/// All junctions of the process plus the shared control plane.
#[derive(Debug)]
pub struct JunctionRegistry {
    junctions: BTreeMap<JunctionId, Arc<JunctionController>>,
    operator: Arc<OperatorState>,
    timing: PhaseTiming,
}

impl JunctionRegistry {
    /// Create one idle controller per id.
    pub fn new(
        ids: impl IntoIterator<Item = JunctionId>,
        timing: PhaseTiming,
        operator: Arc<OperatorState>,
    ) -> Self {
        let junctions = ids
            .into_iter()
            .map(|id| {
                let controller = JunctionController::new(id.clone(), timing, Arc::clone(&operator));
                (id, Arc::new(controller))
            })
            .collect();
        Self {
            junctions,
            operator,
            timing,
        }
    }

    /// Build the registry and its control plane from configuration.
    pub fn from_config(config: &JunctionConfig) -> Result<Self, ConfigError> {
        let ids = config.junction_ids()?;
        let operator = OperatorState::new(&config.control).map_err(|err| ConfigError::Invalid {
            reason: err.to_string(),
        })?;
        Ok(Self::new(
            ids,
            PhaseTiming::from_config(&config.timing),
            Arc::new(operator),
        ))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Controller of junction `id`.
    pub fn get(&self, id: &JunctionId) -> Result<&Arc<JunctionController>, JunctionError> {
        self.junctions
            .get(id)
            .ok_or_else(|| JunctionError::UnknownJunction { id: id.to_string() })
    }

    /// Controller of the junction labelled `label`.
    pub fn get_by_label(&self, label: &str) -> Result<&Arc<JunctionController>, JunctionError> {
        let id = JunctionId::new(label)?;
        self.get(&id)
    }

    /// Registered junction ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &JunctionId> {
        self.junctions.keys()
    }

    /// Registered controllers in id order.
    pub fn controllers(&self) -> impl Iterator<Item = &Arc<JunctionController>> {
        self.junctions.values()
    }

    /// Shared control plane.
    pub const fn operator(&self) -> &Arc<OperatorState> {
        &self.operator
    }

    /// Base phase durations.
    pub const fn timing(&self) -> &PhaseTiming {
        &self.timing
    }

    // -----------------------------------------------------------------------
    // Ingestion / Observation
    // -----------------------------------------------------------------------

    /// Admit a vehicle into a lane of junction `id`.
    pub async fn add_vehicle(
        &self,
        id: &JunctionId,
        category: VehicleCategory,
        lane: LaneId,
    ) -> Result<VehicleId, JunctionError> {
        Ok(self.get(id)?.add_vehicle(category, lane).await)
    }

    /// Admit a vehicle given textual category and lane names.
    pub async fn add_vehicle_named(
        &self,
        id: &JunctionId,
        category: &str,
        lane: &str,
    ) -> Result<VehicleId, JunctionError> {
        let category: VehicleCategory = category.parse()?;
        let lane: LaneId = lane.parse()?;
        self.add_vehicle(id, category, lane).await
    }

    /// Read-only copy of junction `id`.
    pub async fn snapshot(&self, id: &JunctionId) -> Result<JunctionSnapshot, JunctionError> {
        Ok(self.get(id)?.snapshot().await)
    }

    /// Read-only copies of every junction, in id order.
    pub async fn snapshots(&self) -> Vec<JunctionSnapshot> {
        let mut out = Vec::with_capacity(self.junctions.len());
        for controller in self.controllers() {
            out.push(controller.snapshot().await);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Reset a single junction.
    pub async fn reset(&self, id: &JunctionId) -> Result<(), JunctionError> {
        self.get(id)?.reset().await;
        Ok(())
    }

    /// Reset every junction.
    pub async fn reset_all(&self) {
        for controller in self.controllers() {
            controller.reset().await;
        }
        info!(junctions = self.junctions.len(), "All junctions reset");
    }

    /// Pause or resume scheduling for every junction.
    pub fn set_paused(&self, paused: bool) {
        self.operator.set_paused(paused);
        info!(paused, "Scheduler pause toggled");
    }

    /// Change the speed multiplier. Returns the previous value.
    pub fn set_speed(&self, multiplier: f64) -> Result<f64, ControlError> {
        let prev = self.operator.set_speed_multiplier(multiplier)?;
        info!(prev, multiplier, "Speed multiplier changed");
        Ok(prev)
    }

    /// Change the block size. Returns the previous value.
    pub fn set_block_size(&self, block_size: usize) -> Result<usize, ControlError> {
        let prev = self.operator.set_block_size(block_size)?;
        info!(prev, block_size, "Block size changed");
        Ok(prev)
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Tick every junction once.
    pub async fn tick_all(&self) -> Vec<(JunctionId, TickOutcome)> {
        let mut outcomes = Vec::with_capacity(self.junctions.len());
        for (id, controller) in &self.junctions {
            outcomes.push((id.clone(), controller.tick().await));
        }
        outcomes
    }
}
