//! Scenario batch load: CSV uploads of vehicles to enqueue.
//!
//! # CSV format
//!
//! ```csv
//! vehicle_type,lane_id
//! Car,North
//! Ambulance,East
//! Fire Truck,South
//! ```
//!
//! Rows are fed to `AddVehicle` in file order. A row with the wrong
//! number of fields or an unknown vehicle type or lane becomes an
//! [`InvalidScenarioRow`] in the [`ScenarioReport`] and does not stop the
//! batch. A missing or wrong header rejects the whole upload.

use junction_core::controller::JunctionController;
use junction_types::{LaneId, VehicleCategory};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Expected header fields, in order.
pub const SCENARIO_HEADER: [&str; 2] = ["vehicle_type", "lane_id"];

/// Sample scenario offered to clients.
pub const SAMPLE_SCENARIO: &str = "vehicle_type,lane_id
Car,North
Ambulance,East
Bus,North
Car,West
Fire Truck,South
Police,North
";

/// Errors that reject a whole scenario upload.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The first line is not `vehicle_type,lane_id`.
    #[error("scenario header must be `vehicle_type,lane_id`, found {found:?}")]
    BadHeader {
        /// The header line that was read.
        found: String,
    },

    /// The CSV input could not be read at all.
    #[error("failed to read scenario CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A data row that could not be turned into a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct InvalidScenarioRow {
    /// 1-based line number in the upload.
    pub line: u64,
    /// Why the row was rejected.
    pub reason: String,
}

/// One valid data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioRow {
    /// 1-based line number in the upload.
    pub line: u64,
    /// Vehicle category to admit.
    pub category: VehicleCategory,
    /// Lane to admit it into.
    pub lane: LaneId,
}

/// Result of a batch load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Vehicles admitted.
    pub added: usize,
    /// Rows skipped, in file order.
    pub rejected: Vec<InvalidScenarioRow>,
}

/// One raw CSV record, before validation.
#[derive(Debug, Deserialize)]
struct ScenarioRecord {
    vehicle_type: String,
    lane_id: String,
}

impl ScenarioRecord {
    fn validate(&self) -> Result<(VehicleCategory, LaneId), String> {
        let category = self
            .vehicle_type
            .parse::<VehicleCategory>()
            .map_err(|err| format!("{err}"))?;
        let lane = self.lane_id.parse::<LaneId>().map_err(|err| format!("{err}"))?;
        Ok((category, lane))
    }
}

/// Parse a scenario upload into valid rows and rejected rows.
pub fn parse_scenario(
    text: &str,
) -> Result<(Vec<ScenarioRow>, Vec<InvalidScenarioRow>), ScenarioError> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let found = reader.headers()?.clone();
    let header_matches = found.len() == SCENARIO_HEADER.len()
        && found
            .iter()
            .zip(SCENARIO_HEADER)
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));
    if !header_matches {
        return Err(ScenarioError::BadHeader {
            found: found.iter().collect::<Vec<_>>().join(","),
        });
    }
    let headers = csv::StringRecord::from(SCENARIO_HEADER.to_vec());

    let mut rows = Vec::new();
    let mut rejected = Vec::new();
    for (fallback_line, result) in (2_u64..).zip(reader.records()) {
        // Rows with the wrong number of fields fail here.
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(fallback_line, csv::Position::line);
                rejected.push(InvalidScenarioRow {
                    line,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(fallback_line, csv::Position::line);

        let parsed = record
            .deserialize::<ScenarioRecord>(Some(&headers))
            .map_err(|err| format!("{err}"))
            .and_then(|raw| raw.validate());
        match parsed {
            Ok((category, lane)) => rows.push(ScenarioRow {
                line,
                category,
                lane,
            }),
            Err(reason) => rejected.push(InvalidScenarioRow { line, reason }),
        }
    }
    Ok((rows, rejected))
}

/// Parse `text` and admit every valid row into `junction`, in file order.
pub async fn load_scenario(
    junction: &JunctionController,
    text: &str,
) -> Result<ScenarioReport, ScenarioError> {
    let (rows, rejected) = parse_scenario(text)?;
    for row in &rows {
        junction.add_vehicle(row.category, row.lane).await;
    }
    info!(
        junction = %junction.id(),
        added = rows.len(),
        rejected = rejected.len(),
        "Scenario loaded"
    );
    Ok(ScenarioReport {
        added: rows.len(),
        rejected,
    })
}
