//! Recommendation API endpoints.

use axum::extract::{Path, Query, State};
use tracing::debug;

use crate::error::AppError;
use crate::types::{
    Algorithm, CandidateQuery, RecommendationResponse, SimilarQuery, UserQuery,
};

use super::routes::MsgPack;
use super::AppState;

const MAX_SIMILAR_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 100;
const MAX_CANDIDATE_LIMIT: usize = 500;

const REASON_CO_VIEWED: &str = "Users who viewed this also viewed";
const REASON_SIMILAR_SPECS: &str = "Similar specifications";

/// Explanation attached to every item of a similar-vehicles response
fn similar_reason(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::ItemBasedCf => Some(REASON_CO_VIEWED),
        Algorithm::ContentBased => Some(REASON_SIMILAR_SPECS),
        _ => None,
    }
}

fn check_limit(limit: usize, max: usize) -> Result<(), AppError> {
    if limit == 0 || limit > max {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {max}, got {limit}"
        )));
    }
    Ok(())
}

/// Treat an empty `user_id` query value as absent
fn user_id(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|id| !id.is_empty())
}

/// GET /api/v1/recommendations/similar/:vehicle_id
///
/// Vehicles that users who interacted with this one also interacted with.
/// Falls back to attribute similarity for items without co-interactions.
pub async fn similar(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> Result<MsgPack<RecommendationResponse>, AppError> {
    check_limit(query.limit, MAX_SIMILAR_LIMIT)?;

    let mut recs = state
        .engine
        .similar_with_fallback(&vehicle_id, query.limit)
        .await?;

    if let Some(reason) = similar_reason(recs.algorithm) {
        for rec in &mut recs.items {
            rec.reason = Some(reason.to_string());
        }
    }

    debug!(%vehicle_id, algorithm = %recs.algorithm, count = recs.len(), "Similar vehicles");
    Ok(MsgPack(recs.into()))
}

/// GET /api/v1/recommendations/personalized
///
/// Personalized recommendations from the user's recent history. Anonymous
/// requests get the popularity ranking.
pub async fn personalized(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<MsgPack<RecommendationResponse>, AppError> {
    check_limit(query.limit, MAX_LIST_LIMIT)?;

    let recs = match user_id(&query.user_id) {
        Some(user_id) => {
            state
                .engine
                .recommend_for_user(user_id, query.limit, true)
                .await?
        }
        None => state.engine.popular_vehicles(query.limit).await?,
    };

    Ok(MsgPack(recs.into()))
}

/// GET /api/v1/recommendations/candidates
///
/// Over-generated candidates narrowed by optional attribute filters, for a
/// downstream ranking stage.
pub async fn candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<MsgPack<RecommendationResponse>, AppError> {
    check_limit(query.limit, MAX_CANDIDATE_LIMIT)?;

    let filter = query.filter();
    let recs = state
        .engine
        .candidates(user_id(&query.user_id), filter.as_ref(), query.limit)
        .await?;

    Ok(MsgPack(recs.into()))
}

/// GET /api/v1/recommendations/popular
pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<MsgPack<RecommendationResponse>, AppError> {
    check_limit(query.limit, MAX_LIST_LIMIT)?;

    let recs = state.engine.popular_vehicles(query.limit).await?;
    Ok(MsgPack(recs.into()))
}

/// GET /api/v1/recommendations/hybrid
///
/// Personalized results topped up with trending vehicles.
pub async fn hybrid(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<MsgPack<RecommendationResponse>, AppError> {
    check_limit(query.limit, MAX_LIST_LIMIT)?;

    let recs = state
        .engine
        .hybrid(user_id(&query.user_id), query.limit)
        .await?;

    Ok(MsgPack(recs.into()))
}
