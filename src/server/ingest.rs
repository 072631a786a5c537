//! Ingestion handlers for interactions and catalog records.
//!
//! Writes go straight to the stores. The engine picks them up on its next
//! refresh; published snapshots are never mutated in place.

use axum::extract::State;
use tracing::{debug, info};

use crate::error::AppError;
use crate::types::{
    InteractionEvent, RecordInteractionRequest, RecordInteractionResponse, UpsertVehiclesRequest,
    UpsertVehiclesResponse,
};

use super::extractors::MsgPackExtractor;
use super::routes::MsgPack;
use super::AppState;

/// Largest catalog batch accepted in one request
const MAX_BATCH_SIZE: usize = 1000;

/// How far ahead of the server clock an interaction timestamp may be
const MAX_CLOCK_SKEW_S: i64 = 86_400;

/// POST /api/v1/interactions
///
/// Append one interaction to the log. The timestamp defaults to now.
pub async fn record_interaction(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<RecordInteractionRequest>,
) -> Result<MsgPack<RecordInteractionResponse>, AppError> {
    if req.user_id.trim().is_empty() || req.vehicle_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "user_id and vehicle_id are required".to_string(),
        ));
    }
    if req.interaction_type.trim().is_empty() {
        return Err(AppError::BadRequest(
            "interaction_type is required".to_string(),
        ));
    }
    if let Some(score) = req.explicit_score {
        if !score.is_finite() || score < 0.0 {
            return Err(AppError::BadRequest(
                "explicit_score must be a non-negative number".to_string(),
            ));
        }
    }

    let now = chrono::Utc::now().timestamp();
    let timestamp = req.timestamp.unwrap_or(now);
    if timestamp < 0 || timestamp > now.saturating_add(MAX_CLOCK_SKEW_S) {
        return Err(AppError::BadRequest(format!(
            "timestamp {timestamp} is out of range"
        )));
    }

    let mut event = InteractionEvent::new(
        req.user_id,
        req.vehicle_id,
        req.interaction_type.as_str(),
        timestamp,
    );
    if let Some(score) = req.explicit_score {
        event = event.with_score(score);
    }

    debug!(
        user_id = %event.user_id,
        vehicle_id = %event.vehicle_id,
        interaction_type = %event.interaction_type,
        "Recording interaction"
    );
    state.stores.interactions.append(event).await?;

    Ok(MsgPack(RecordInteractionResponse {
        recorded: true,
        timestamp,
    }))
}

/// POST /api/v1/vehicles/batch-upsert
///
/// Insert or replace catalog records.
pub async fn batch_upsert_vehicles(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<UpsertVehiclesRequest>,
) -> Result<MsgPack<UpsertVehiclesResponse>, AppError> {
    if req.vehicles.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "Batch size {} exceeds maximum of {MAX_BATCH_SIZE}",
            req.vehicles.len()
        )));
    }
    if let Some(bad) = req.vehicles.iter().find(|v| v.vehicle_id.trim().is_empty()) {
        return Err(AppError::BadRequest(format!(
            "vehicle_id is required (record titled {:?})",
            bad.title
        )));
    }

    let upserted = state.stores.vehicles.upsert_vehicles(req.vehicles).await?;
    info!(upserted, "Catalog records upserted");

    Ok(MsgPack(UpsertVehiclesResponse { upserted }))
}
