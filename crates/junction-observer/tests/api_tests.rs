//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use junction_core::config::JunctionConfig;
use junction_core::registry::JunctionRegistry;
use junction_observer::router::build_router;
use junction_observer::state::AppState;
use junction_types::{JunctionId, LaneId, VehicleCategory};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    let config = JunctionConfig::parse("junctions: [A, B]").unwrap();
    let registry = JunctionRegistry::from_config(&config).unwrap();
    Arc::new(AppState::new(Arc::new(registry)))
}

fn junction_a() -> JunctionId {
    JunctionId::new("A").unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =========================================================================
// Junctions
// =========================================================================

#[tokio::test]
async fn test_list_junctions() {
    let state = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/junctions").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["junctions"][0]["id"], "A");
    assert_eq!(json["junctions"][1]["id"], "B");
}

#[tokio::test]
async fn test_get_junction_snapshot() {
    let state = make_test_state();
    state
        .registry
        .add_vehicle(&junction_a(), VehicleCategory::FireTruck, LaneId::South)
        .await
        .unwrap();
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/junctions/A").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["signal_state"], "red");
    assert_eq!(json["is_processing"], false);
    assert_eq!(json["status_message"], "System Idle. Add vehicles to begin.");
    assert_eq!(json["waiting_emergency_vehicles"], 1);
    assert_eq!(json["lanes"]["South"]["queue"][0]["category"], "Fire Truck");
    assert_eq!(json["lanes"]["South"]["queue"][0]["priority"], 2);
    assert!(json["last_processed_lane_index"].is_null());
}

#[tokio::test]
async fn test_unknown_junction_is_404() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/api/junctions/Z").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_add_vehicle() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json(
            "/api/junctions/A/vehicles",
            &json!({ "vehicle_type": "Ambulance", "lane_id": "east" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    assert!(json["vehicle_id"].is_string());

    let snapshot = state.registry.snapshot(&junction_a()).await.unwrap();
    assert_eq!(snapshot.queue_len(LaneId::East), 1);
}

#[tokio::test]
async fn test_add_vehicle_invalid_lane_is_400() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json(
            "/api/junctions/A/vehicles",
            &json!({ "vehicle_type": "Car", "lane_id": "Northeast" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Northeast"));
    let snapshot = state.registry.snapshot(&junction_a()).await.unwrap();
    assert_eq!(snapshot.total_waiting(), 0);
}

#[tokio::test]
async fn test_add_vehicle_invalid_category_is_400() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/junctions/A/vehicles",
            &json!({ "vehicle_type": "Tank", "lane_id": "North" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_junction() {
    let state = make_test_state();
    state
        .registry
        .add_vehicle(&junction_a(), VehicleCategory::Car, LaneId::West)
        .await
        .unwrap();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(
            Request::post("/api/junctions/A/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["lanes"]["West"]["queue"].as_array().unwrap().len(), 0);
}

// =========================================================================
// WebSocket
// =========================================================================

fn ws_request(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_ws_unknown_junction_is_404() {
    let router = build_router(make_test_state());

    let response = router.oneshot(ws_request("/ws/junctions/Z")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains('Z'));
}

#[tokio::test]
async fn test_ws_known_junction_without_upgrade_is_rejected() {
    let router = build_router(make_test_state());

    // No live connection backs the request, so it cannot be upgraded.
    let response = router.oneshot(ws_request("/ws/junctions/A")).await.unwrap();

    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Scenario and export
// =========================================================================

#[tokio::test]
async fn test_sample_scenario() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::get("/api/scenario/sample")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_to_string(response.into_body()).await;
    assert!(text.starts_with("vehicle_type,lane_id\n"));
    assert!(text.contains("Fire Truck,South"));
}

#[tokio::test]
async fn test_load_scenario_reports_rejected_rows() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let csv = "vehicle_type,lane_id\nCar,North\nHelicopter,North\nBus,East\n";
    let response = router
        .oneshot(
            Request::post("/api/junctions/A/scenario")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["added"], 2);
    assert_eq!(json["rejected"][0]["line"], 3);

    let snapshot = state.registry.snapshot(&junction_a()).await.unwrap();
    assert_eq!(snapshot.queue_len(LaneId::North), 1);
    assert_eq!(snapshot.queue_len(LaneId::East), 1);
}

#[tokio::test]
async fn test_load_scenario_bad_header_is_400() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(
            Request::post("/api/junctions/A/scenario")
                .body(Body::from("lane,type\nNorth,Car\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let snapshot = state.registry.snapshot(&junction_a()).await.unwrap();
    assert_eq!(snapshot.total_waiting(), 0);
}

#[tokio::test]
async fn test_export_log_csv() {
    let state = make_test_state();
    state
        .registry
        .add_vehicle(&junction_a(), VehicleCategory::Bus, LaneId::North)
        .await
        .unwrap();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/junctions/A/log")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.contains("text/csv"));
    let text = body_to_string(response.into_body()).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("vehicle_arrived"));
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_pause_and_resume() {
    let state = make_test_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::post("/api/operator/pause")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.operator().is_paused());

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::post("/api/operator/resume")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.operator().is_paused());
}

#[tokio::test]
async fn test_set_speed() {
    let state = make_test_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/operator/speed", &json!({ "multiplier": 2.5 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!((state.operator().speed_multiplier() - 2.5).abs() < f64::EPSILON);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/operator/speed", &json!({ "multiplier": 0.0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!((state.operator().speed_multiplier() - 2.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_set_block_size() {
    let state = make_test_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/operator/block-size", &json!({ "block_size": 5 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.operator().block_size(), 5);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/operator/block-size", &json!({ "block_size": 9 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.operator().block_size(), 5);
}

#[tokio::test]
async fn test_reset_all() {
    let state = make_test_state();
    for label in ["A", "B"] {
        state
            .registry
            .add_vehicle(
                &JunctionId::new(label).unwrap(),
                VehicleCategory::Car,
                LaneId::North,
            )
            .await
            .unwrap();
    }

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::post("/api/operator/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    for snapshot in state.registry.snapshots().await {
        assert_eq!(snapshot.total_waiting(), 0);
    }
}

#[tokio::test]
async fn test_operator_status() {
    let state = make_test_state();
    state.operator().pause();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/operator/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["block_size"], 3);
    assert_eq!(json["speed_multiplier"], 1.0);
}
