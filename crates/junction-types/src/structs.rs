//! Core entity structs: vehicles, lane and junction snapshots, and
//! activity log entries.
//!
//! Snapshots are read-only copies handed to display collaborators after
//! every mutation. They are never fed back into the scheduler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActivityKind, LaneId, SignalState, VehicleCategory};
use crate::ids::{JunctionId, VehicleId};

/// Priority rank at or below which a vehicle counts as an emergency vehicle
/// (Ambulance, Fire Truck, Police).
pub const EMERGENCY_PRIORITY_THRESHOLD: u8 = 3;

// ---------------------------------------------------------------------------
// Vehicle
// ---------------------------------------------------------------------------

/// A vehicle waiting in (or passing out of) a lane queue.
///
/// Immutable after creation. Its position in the queue is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vehicle {
    /// Unique vehicle identifier.
    pub id: VehicleId,
    /// Vehicle category.
    pub category: VehicleCategory,
    /// Priority rank taken from the category at admission (lower is more urgent).
    pub priority: u8,
    /// Wall-clock admission time.
    pub arrived_at: DateTime<Utc>,
    /// Lane the vehicle queued in.
    pub lane: LaneId,
}

impl Vehicle {
    /// Admit a new vehicle of `category` into `lane`, stamped with the
    /// current time and a fresh id.
    pub fn new(category: VehicleCategory, lane: LaneId) -> Self {
        Self {
            id: VehicleId::new(),
            category,
            priority: category.priority(),
            arrived_at: Utc::now(),
            lane,
        }
    }

    /// Whether the vehicle belongs to an emergency service.
    pub const fn is_emergency(&self) -> bool {
        self.priority <= EMERGENCY_PRIORITY_THRESHOLD
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only copy of one lane's queue, head first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LaneSnapshot {
    /// The lane.
    pub id: LaneId,
    /// Waiting vehicles in arrival order.
    pub queue: Vec<Vehicle>,
}

impl LaneSnapshot {
    /// Most urgent priority waiting in the lane, or `None` for an empty lane.
    pub fn min_priority(&self) -> Option<u8> {
        self.queue.iter().map(|v| v.priority).min()
    }
}

/// Read-only copy of a junction's full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JunctionSnapshot {
    /// Junction identifier.
    pub id: JunctionId,
    /// All four lanes keyed by lane id.
    pub lanes: BTreeMap<LaneId, LaneSnapshot>,
    /// Lane currently holding right-of-way.
    pub active_lane: Option<LaneId>,
    /// Current signal aspect.
    pub signal_state: SignalState,
    /// Whether a service episode is in flight.
    pub is_processing: bool,
    /// Vehicle currently crossing the junction.
    pub passing_vehicle: Option<Vehicle>,
    /// Round-robin cursor as a position in the fixed lane order
    /// (`None` until a normal episode has served a lane).
    pub last_processed_lane_index: Option<u8>,
    /// Lane that just finished an emergency clearance (display only).
    pub cleared_lane_id: Option<LaneId>,
    /// Vehicles dequeued since the last reset.
    pub total_vehicles_cleared: u64,
    /// Dequeued vehicles with an emergency priority.
    pub emergency_vehicles_cleared: u64,
    /// Emergency vehicles still waiting across all lanes.
    pub waiting_emergency_vehicles: u64,
    /// Human-readable description of the current phase.
    pub status_message: String,
}

impl JunctionSnapshot {
    /// Snapshot of a single lane.
    pub fn lane(&self, lane: LaneId) -> Option<&LaneSnapshot> {
        self.lanes.get(&lane)
    }

    /// Number of vehicles waiting in `lane`.
    pub fn queue_len(&self, lane: LaneId) -> usize {
        self.lane(lane).map_or(0, |l| l.queue.len())
    }

    /// Number of vehicles waiting across all lanes.
    pub fn total_waiting(&self) -> usize {
        self.lanes.values().map(|l| l.queue.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// One entry of a junction's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActivityEntry {
    /// Position in the log since the last reset, starting at 1.
    pub sequence: u64,
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
    /// What happened.
    pub kind: ActivityKind,
    /// Lane involved, if any.
    pub lane: Option<LaneId>,
    /// Vehicle involved, if any.
    pub vehicle: Option<VehicleId>,
    /// Human-readable description.
    pub message: String,
}
