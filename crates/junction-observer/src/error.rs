//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use junction_core::operator::ControlError;
use junction_core::registry::JunctionError;

use crate::export::ExportError;
use crate::scenario::ScenarioError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// Ingestion or lookup failed in the core.
    #[error(transparent)]
    Junction(#[from] JunctionError),

    /// A control value was rejected.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The scenario upload could not be read.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// An export could not be rendered.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Junction(
                JunctionError::UnknownJunction { .. } | JunctionError::InvalidJunctionId(_),
            ) => StatusCode::NOT_FOUND,
            Self::Junction(_) | Self::Control(_) | Self::Scenario(_) => StatusCode::BAD_REQUEST,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::{JunctionId, LaneId};

    use super::*;

    fn status_of(err: ObserverError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn lookup_failures_are_not_found() {
        let unknown = JunctionError::UnknownJunction {
            id: "Z".to_owned(),
        };
        assert_eq!(status_of(unknown.into()), StatusCode::NOT_FOUND);
        let invalid = JunctionId::new("no spaces").unwrap_err();
        assert_eq!(
            status_of(JunctionError::from(invalid).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rejected_input_is_bad_request() {
        let lane = "Up".parse::<LaneId>().unwrap_err();
        assert_eq!(
            status_of(JunctionError::from(lane).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ControlError::InvalidBlockSize { value: 0 }.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn export_failures_are_internal() {
        let err = ExportError::Buffer("writer poisoned".to_owned());
        assert_eq!(status_of(err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
