//! Enumeration types for the junction controller.
//!
//! Vehicle categories and their urgency ranks, the four approach lanes in
//! their fixed scan order, signal aspects, and activity log entry kinds.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// A lane name did not match any of the four approaches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lane {input:?}: expected one of North, East, South, West")]
pub struct InvalidLaneError {
    /// The rejected input.
    pub input: String,
}

/// A vehicle category name did not match the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid vehicle category {input:?}: expected one of Ambulance, Fire Truck, Police, Bus, Car"
)]
pub struct InvalidVehicleCategoryError {
    /// The rejected input.
    pub input: String,
}

// ---------------------------------------------------------------------------
// Vehicle categories
// ---------------------------------------------------------------------------

/// Category of a vehicle waiting at the junction.
///
/// Each category maps to a fixed priority rank where a lower value is more
/// urgent: Ambulance 1, Fire Truck 2, Police 3, Bus 4, Car 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VehicleCategory {
    /// Ambulance, the most urgent category.
    Ambulance,
    /// Fire engine.
    #[serde(rename = "Fire Truck")]
    FireTruck,
    /// Police car.
    Police,
    /// Public transport bus.
    Bus,
    /// Private car.
    Car,
}

impl VehicleCategory {
    /// Every category, most urgent first.
    pub const ALL: [Self; 5] = [
        Self::Ambulance,
        Self::FireTruck,
        Self::Police,
        Self::Bus,
        Self::Car,
    ];

    /// Priority rank of the category (lower is more urgent).
    pub const fn priority(self) -> u8 {
        match self {
            Self::Ambulance => 1,
            Self::FireTruck => 2,
            Self::Police => 3,
            Self::Bus => 4,
            Self::Car => 5,
        }
    }

    /// Human-readable name, as used in scenario files and status messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ambulance => "Ambulance",
            Self::FireTruck => "Fire Truck",
            Self::Police => "Police",
            Self::Bus => "Bus",
            Self::Car => "Car",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VehicleCategory {
    type Err = InvalidVehicleCategoryError;

    /// Parse a category name case-insensitively.
    ///
    /// `Fire Truck`, `FireTruck` and `fire_truck` all name the fire engine.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "ambulance" => Ok(Self::Ambulance),
            "firetruck" => Ok(Self::FireTruck),
            "police" => Ok(Self::Police),
            "bus" => Ok(Self::Bus),
            "car" => Ok(Self::Car),
            _ => Err(InvalidVehicleCategoryError {
                input: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Lanes
// ---------------------------------------------------------------------------

/// One of the four approaches feeding the junction.
///
/// Declaration order is the fixed lane ordering used for every scan and
/// tie-break: North, East, South, West.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LaneId {
    /// Northern approach.
    North,
    /// Eastern approach.
    East,
    /// Southern approach.
    South,
    /// Western approach.
    West,
}

impl LaneId {
    /// All lanes in the fixed scan order.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Position of the lane in [`LaneId::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Lane at the given position of [`LaneId::ALL`], if any.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::North),
            1 => Some(Self::East),
            2 => Some(Self::South),
            3 => Some(Self::West),
            _ => None,
        }
    }

    /// Human-readable lane name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::East => "East",
            Self::South => "South",
            Self::West => "West",
        }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LaneId {
    type Err = InvalidLaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Self::North),
            "east" => Ok(Self::East),
            "south" => Ok(Self::South),
            "west" => Ok(Self::West),
            _ => Err(InvalidLaneError {
                input: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Signal aspect
// ---------------------------------------------------------------------------

/// Aspect currently shown by the junction's signal head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SignalState {
    /// Stop. The idle aspect.
    #[default]
    Red,
    /// Clearance interval before reverting to red.
    Yellow,
    /// Right-of-way granted to the active lane.
    Green,
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// Kind of an entry in a junction's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActivityKind {
    /// A vehicle joined the tail of a lane queue.
    VehicleArrived,
    /// A full emergency clearance of a lane began.
    EmergencyStarted,
    /// A normal single-vehicle service episode began.
    ServiceStarted,
    /// A vehicle left its queue and crossed the junction.
    VehiclePassed,
    /// An emergency clearance finished and the lane went back to red.
    LaneCleared,
}

impl ActivityKind {
    /// Stable name used in CSV exports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VehicleArrived => "vehicle_arrived",
            Self::EmergencyStarted => "emergency_started",
            Self::ServiceStarted => "service_started",
            Self::VehiclePassed => "vehicle_passed",
            Self::LaneCleared => "lane_cleared",
        }
    }
}
