//! Shared type definitions for the junction signal controller.
//!
//! This crate is the single source of truth for the data model shared by
//! the scheduling core, the observer API and the display front end. Types
//! flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Vehicle and junction identifiers
//! - [`enums`] -- Vehicle categories, lanes, signal aspects, activity kinds
//! - [`structs`] -- Vehicles, snapshots and activity log entries

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ActivityKind, InvalidLaneError, InvalidVehicleCategoryError, LaneId, SignalState,
    VehicleCategory,
};
pub use ids::{InvalidJunctionIdError, JunctionId, VehicleId};
pub use structs::{
    ActivityEntry, EMERGENCY_PRIORITY_THRESHOLD, JunctionSnapshot, LaneSnapshot, Vehicle,
};
