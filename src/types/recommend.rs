//! API types for recommendation operations.
//!
//! Every recommendation operation returns an ordered list of
//! [`Recommendation`]s tagged with the [`Algorithm`] that produced it, so
//! callers can tell a collaborative result from a fallback.

use serde::{Deserialize, Serialize};

use crate::storage::AttributeFilter;

/// Which strategy produced a recommendation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    ItemBasedCf,
    ContentBased,
    Popularity,
    HybridCandidateGeneration,
    Hybrid,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ItemBasedCf => "item-based-cf",
            Self::ContentBased => "content-based",
            Self::Popularity => "popularity",
            Self::HybridCandidateGeneration => "hybrid-candidate-generation",
            Self::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// A single recommended vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub vehicle_id: String,
    pub score: f32,
    /// Human-readable explanation, when one applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Recommendation {
    pub fn new(vehicle_id: impl Into<String>, score: f32) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            score,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Ordered recommendations plus the path that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub algorithm: Algorithm,
    pub items: Vec<Recommendation>,
}

impl Recommendations {
    pub fn new(algorithm: Algorithm, items: Vec<Recommendation>) -> Self {
        Self { algorithm, items }
    }

    pub fn empty(algorithm: Algorithm) -> Self {
        Self::new(algorithm, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Vehicle ids in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|r| r.vehicle_id.as_str()).collect()
    }
}

/// Query for `GET /recommendations/similar/:vehicle_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize {
    10
}

/// Query for the personalized, popular and hybrid endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    20
}

/// Query for `GET /recommendations/candidates`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_candidate_limit")]
    pub limit: usize,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price_min: Option<f32>,
    #[serde(default)]
    pub price_max: Option<f32>,
    #[serde(default)]
    pub fuel_type: Option<String>,
}

fn default_candidate_limit() -> usize {
    100
}

impl CandidateQuery {
    /// Attribute filter carried by the query, if any field is set
    pub fn filter(&self) -> Option<AttributeFilter> {
        let filter = AttributeFilter {
            brand: self.brand.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            fuel_type: self.fuel_type.clone(),
        };
        (!filter.is_empty()).then_some(filter)
    }
}

/// Query for `POST /recommendations/refresh`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshQuery {
    /// Override the configured lookback window
    #[serde(default)]
    pub lookback_days: Option<u32>,
}

/// Response body shared by every recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub total: usize,
    pub algorithm: Algorithm,
}

impl From<Recommendations> for RecommendationResponse {
    fn from(recs: Recommendations) -> Self {
        Self {
            total: recs.items.len(),
            recommendations: recs.items,
            algorithm: recs.algorithm,
        }
    }
}

/// Request to record one interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInteractionRequest {
    pub user_id: String,
    pub vehicle_id: String,
    pub interaction_type: String,
    #[serde(default)]
    pub explicit_score: Option<f32>,
    /// Defaults to the time the request is received
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInteractionResponse {
    pub recorded: bool,
    pub timestamp: i64,
}

/// Request to upsert catalog records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertVehiclesRequest {
    pub vehicles: Vec<super::VehicleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertVehiclesResponse {
    pub upserted: usize,
}
