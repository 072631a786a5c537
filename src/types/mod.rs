//! Shared types for the recommendation service API.
//!
//! These types are used across the application for request/response handling
//! and internal data representation.

pub mod interactions;
pub mod recommend;
pub mod vehicles;

use serde::{Deserialize, Serialize};

pub use interactions::{InteractionEvent, InteractionType};
pub use recommend::*;
pub use vehicles::{PopularityRow, VehicleRecord};

use crate::recommend::EngineStatus;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(default)]
    pub engine_fitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// System status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub storage_mode: String,
    pub engine: EngineStatus,
}
