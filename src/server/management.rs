//! Management API route handlers.
//!
//! Provides endpoints for:
//! - System and engine status
//! - On-demand engine refresh

use axum::extract::{Query, State};
use tracing::info;

use crate::error::AppError;
use crate::recommend::FitReport;
use crate::types::{RefreshQuery, StatusResponse};

use super::routes::{MsgPack, VERSION};
use super::AppState;

/// Longest accepted refresh window, in days
const MAX_LOOKBACK_DAYS: u32 = 3650;

/// GET /api/v1/status
///
/// Engine lifecycle state plus process information.
pub async fn status(State(state): State<AppState>) -> MsgPack<StatusResponse> {
    MsgPack(StatusResponse {
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        storage_mode: state.stores.mode.to_string(),
        engine: state.engine.status().await,
    })
}

/// POST /api/v1/recommendations/refresh
///
/// Refit the engine from the interaction log. Queries keep being served
/// from the previous index until the new one is published.
pub async fn refresh(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<MsgPack<FitReport>, AppError> {
    if let Some(days) = query.lookback_days {
        if days == 0 || days > MAX_LOOKBACK_DAYS {
            return Err(AppError::BadRequest(format!(
                "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}"
            )));
        }
    }

    info!(lookback_days = ?query.lookback_days, "Refresh requested");
    let report = state.engine.fit(query.lookback_days).await?;

    Ok(MsgPack(report))
}
