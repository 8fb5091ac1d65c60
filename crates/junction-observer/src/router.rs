//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// CORS is configured to allow any origin so a locally served display
/// can reach the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/junctions/{id}", get(ws::ws_junction))
        // Junctions
        .route("/api/junctions", get(handlers::list_junctions))
        .route("/api/junctions/{id}", get(handlers::get_junction))
        .route("/api/junctions/{id}/vehicles", post(handlers::add_vehicle))
        .route("/api/junctions/{id}/reset", post(handlers::reset_junction))
        .route("/api/junctions/{id}/scenario", post(handlers::load_scenario))
        .route("/api/junctions/{id}/log", get(handlers::export_log))
        .route("/api/scenario/sample", get(handlers::sample_scenario))
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/block-size", post(operator::set_block_size))
        .route("/api/operator/reset", post(operator::reset_all))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
