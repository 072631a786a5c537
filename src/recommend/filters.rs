//! Post-hoc attribute filtering of candidate lists.

use super::engine::EngineError;
use crate::storage::{AttributeFilter, VehicleSource};
use crate::types::Recommendation;

/// Reject predicates that cannot be evaluated unambiguously
pub fn validate_filter(filter: &AttributeFilter) -> Result<(), EngineError> {
    for (name, value) in [("brand", &filter.brand), ("fuel_type", &filter.fuel_type)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(EngineError::InvalidFilter(format!("{name} must not be blank")));
        }
    }

    for (name, value) in [("price_min", filter.price_min), ("price_max", filter.price_max)] {
        if let Some(price) = value {
            if !price.is_finite() || price < 0.0 {
                return Err(EngineError::InvalidFilter(format!(
                    "{name} must be a non-negative number, got {price}"
                )));
            }
        }
    }

    if let (Some(min), Some(max)) = (filter.price_min, filter.price_max) {
        if min > max {
            return Err(EngineError::InvalidFilter(format!(
                "price_min ({min}) exceeds price_max ({max})"
            )));
        }
    }

    Ok(())
}

/// Keep only candidates whose vehicle satisfies `filter`.
///
/// The result is a subsequence of `candidates`: scores and relative order
/// are untouched. An empty filter is the identity and never queries the
/// catalog.
pub async fn apply_filters(
    candidates: Vec<Recommendation>,
    filter: &AttributeFilter,
    vehicles: &dyn VehicleSource,
) -> Result<Vec<Recommendation>, EngineError> {
    validate_filter(filter)?;

    if filter.is_empty() || candidates.is_empty() {
        return Ok(candidates);
    }

    let ids: Vec<String> = candidates.iter().map(|c| c.vehicle_id.clone()).collect();
    let allowed = vehicles.filter_ids(&ids, filter).await?;

    Ok(candidates
        .into_iter()
        .filter(|c| allowed.contains(&c.vehicle_id))
        .collect())
}
