//! HTTP route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::types::{HealthResponse, HealthStatus};

use super::AppState;

pub(super) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `MessagePack` response wrapper
pub struct MsgPack<T>(pub T);

impl<T: serde::Serialize> IntoResponse for MsgPack<T> {
    fn into_response(self) -> Response {
        match rmp_serde::to_vec_named(&self.0) {
            Ok(bytes) => (
                StatusCode::OK,
                [("content-type", "application/msgpack")],
                bytes,
            )
                .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize response: {e}"),
            )
                .into_response(),
        }
    }
}

/// Health check endpoint
///
/// GET /api/v1/health
///
/// Reports `degraded` until the first fit publishes an index; fallbacks are
/// still served in that state.
pub async fn health(State(state): State<AppState>) -> MsgPack<HealthResponse> {
    let engine_fitted = state.engine.is_fitted().await;

    let status = if engine_fitted {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    MsgPack(HealthResponse {
        status,
        version: VERSION.to_string(),
        engine_fitted,
    })
}
