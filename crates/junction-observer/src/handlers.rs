//! REST API endpoint handlers for junction ingestion and observation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/junctions` | Snapshots of all junctions |
//! | `GET` | `/api/junctions/{id}` | Snapshot of one junction |
//! | `POST` | `/api/junctions/{id}/vehicles` | Admit a vehicle |
//! | `POST` | `/api/junctions/{id}/reset` | Reset one junction |
//! | `POST` | `/api/junctions/{id}/scenario` | Batch-load a CSV scenario |
//! | `GET` | `/api/junctions/{id}/log` | Activity log as CSV |
//! | `GET` | `/api/scenario/sample` | Sample scenario CSV |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use junction_types::{JunctionSnapshot, VehicleId};

use crate::error::ObserverError;
use crate::export;
use crate::scenario::{self, SAMPLE_SCENARIO, ScenarioReport};
use crate::state::AppState;

/// Content type of CSV responses.
const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/junctions/{id}/vehicles`.
#[derive(Debug, serde::Deserialize)]
pub struct AddVehicleRequest {
    /// Vehicle category name, e.g. `"Fire Truck"`.
    pub vehicle_type: String,
    /// Lane name, e.g. `"North"`.
    pub lane_id: String,
}

/// Response body for `POST /api/junctions/{id}/vehicles`.
#[derive(Debug, serde::Serialize)]
pub struct AddVehicleResponse {
    /// Identifier of the admitted vehicle.
    pub vehicle_id: VehicleId,
}

/// Response body for `GET /api/junctions`.
#[derive(Debug, serde::Serialize)]
pub struct JunctionList {
    /// Number of junctions.
    pub count: usize,
    /// Junction snapshots in id order.
    pub junctions: Vec<JunctionSnapshot>,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// List snapshots of every junction.
pub async fn list_junctions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let junctions = state.registry.snapshots().await;
    Json(JunctionList {
        count: junctions.len(),
        junctions,
    })
}

/// Snapshot of one junction.
pub async fn get_junction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JunctionSnapshot>, ObserverError> {
    let junction = state.registry.get_by_label(&id)?;
    Ok(Json(junction.snapshot().await))
}

/// Activity log of one junction as CSV.
pub async fn export_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let junction = state.registry.get_by_label(&id)?;
    let csv = export::activity_csv(&junction.activity_log().await)?;
    Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], csv))
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Admit one vehicle at the tail of a lane.
pub async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AddVehicleRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let junction = state.registry.get_by_label(&id)?;
    let vehicle_id = state
        .registry
        .add_vehicle_named(junction.id(), &body.vehicle_type, &body.lane_id)
        .await?;
    Ok((StatusCode::CREATED, Json(AddVehicleResponse { vehicle_id })))
}

/// Batch-load a CSV scenario into one junction.
pub async fn load_scenario(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<ScenarioReport>, ObserverError> {
    let junction = state.registry.get_by_label(&id)?;
    let report = scenario::load_scenario(junction, &body).await?;
    Ok(Json(report))
}

/// The sample scenario.
pub async fn sample_scenario() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], SAMPLE_SCENARIO)
}

// ---------------------------------------------------------------------------
// Per-junction control
// ---------------------------------------------------------------------------

/// Reset one junction and return its fresh snapshot.
pub async fn reset_junction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JunctionSnapshot>, ObserverError> {
    let junction = state.registry.get_by_label(&id)?;
    junction.reset().await;
    Ok(Json(junction.snapshot().await))
}
