//! Operator REST API handlers for runtime control.
//!
//! Controls are global: they apply to every junction.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Suppress scheduler ticks |
//! | `POST` | `/api/operator/resume` | Resume scheduler ticks |
//! | `POST` | `/api/operator/speed` | Set the speed multiplier |
//! | `POST` | `/api/operator/block-size` | Set the block size |
//! | `POST` | `/api/operator/reset` | Reset every junction |
//! | `GET` | `/api/operator/status` | Current control state |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New speed multiplier (0.1 to 10.0).
    pub multiplier: f64,
}

/// Request body for `POST /api/operator/block-size`.
#[derive(Debug, serde::Deserialize)]
pub struct SetBlockSizeRequest {
    /// New block size (1 to 8).
    pub block_size: usize,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn ok(message: String) -> Json<OperatorResponse> {
    Json(OperatorResponse { ok: true, message })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Pause scheduling. Episodes in flight run to completion.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.registry.set_paused(true);
    ok("Scheduler paused".to_owned())
}

/// Resume scheduling after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.registry.set_paused(false);
    ok("Scheduler resumed".to_owned())
}

/// Change the speed multiplier for subsequently scheduled delays.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = state.registry.set_speed(body.multiplier)?;
    Ok(ok(format!(
        "Speed multiplier changed from {prev} to {}",
        body.multiplier
    )))
}

/// Change the block size, effective from the next tick.
pub async fn set_block_size(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetBlockSizeRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = state.registry.set_block_size(body.block_size)?;
    Ok(ok(format!(
        "Block size changed from {prev} to {}",
        body.block_size
    )))
}

/// Reset every junction.
pub async fn reset_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.registry.reset_all().await;
    ok("All junctions reset".to_owned())
}

/// Current control state.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.operator().status())
}
