//! `WebSocket` handler for real-time junction snapshots.
//!
//! Clients connect to `GET /ws/junctions/{id}` and receive the current
//! [`JunctionSnapshot`](junction_types::JunctionSnapshot) as a JSON text
//! frame, then a fresh one after every mutation of that junction.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent snapshot.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use junction_core::controller::JunctionController;
use junction_types::JunctionSnapshot;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots of one junction.
///
/// # Route
///
/// `GET /ws/junctions/{id}`
///
/// The junction is looked up before the upgrade is checked, so an unknown
/// id is a 404 whether or not the request could be upgraded.
pub async fn ws_junction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ObserverError> {
    let junction = Arc::clone(state.registry.get_by_label(&id)?);
    let response = match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_ws(socket, junction))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    };
    Ok(response)
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &JunctionSnapshot) -> bool {
    let json = match serde_json::to_string(snapshot) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize junction snapshot: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: send the current snapshot, then
/// forward every broadcast snapshot as a text frame.
async fn handle_ws(mut socket: WebSocket, junction: Arc<JunctionController>) {
    debug!(junction = %junction.id(), "WebSocket client connected");

    let mut rx = junction.subscribe();
    if !send_snapshot(&mut socket, &junction.snapshot().await).await {
        debug!("WebSocket client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        if !send_snapshot(&mut socket, &snapshot).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Snapshot channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
