//! Observer API server for the junction signal controller.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for vehicle ingestion, junction snapshots and the
//!   activity log export
//! - **Scenario batch load** of `vehicle_type,lane_id` CSV uploads
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   speed, block size, reset, status)
//! - **`WebSocket` endpoint** (`/ws/junctions/{id}`) pushing a junction
//!   snapshot after every mutation via [`tokio::sync::broadcast`]
//!
//! # Architecture
//!
//! Handlers call straight into the shared
//! [`JunctionRegistry`](junction_core::registry::JunctionRegistry). Every
//! read takes the junction's lock only long enough to copy a snapshot, so
//! the observer never holds up a phase step.

pub mod error;
pub mod export;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod scenario;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
