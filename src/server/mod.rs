//! HTTP server setup and routing.

mod extractors;
mod ingest;
mod management;
mod recommendations;
mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::recommend::{EngineSettings, Recommender};
use crate::storage::Stores;

pub use routes::MsgPack;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Interaction log and catalog
    pub stores: Stores,
    /// Recommendation engine (snapshot swapped on refresh)
    pub engine: Arc<Recommender>,
    /// Server start time for uptime calculation
    pub started_at: Instant,
}

impl AppState {
    /// Create state with an engine reading from `stores`
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        let settings = EngineSettings::from(&config.engine);
        let engine = Arc::new(Recommender::from_stores(&stores, settings));
        Self::with_engine(config, stores, engine)
    }

    /// Create state around an existing engine
    pub fn with_engine(config: AppConfig, stores: Stores, engine: Arc<Recommender>) -> Self {
        Self {
            config: Arc::new(config),
            stores,
            engine,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Creates the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(management::status))
        // Recommendation endpoints
        .route(
            "/recommendations/similar/:vehicle_id",
            get(recommendations::similar),
        )
        .route(
            "/recommendations/personalized",
            get(recommendations::personalized),
        )
        .route("/recommendations/candidates", get(recommendations::candidates))
        .route("/recommendations/popular", get(recommendations::popular))
        .route("/recommendations/hybrid", get(recommendations::hybrid))
        .route("/recommendations/refresh", post(management::refresh))
        // Ingestion endpoints
        .route("/interactions", post(ingest::record_interaction))
        .route("/vehicles/batch-upsert", post(ingest::batch_upsert_vehicles));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
