//! Vehicle Recommendation Service
//!
//! An item-based collaborative filtering recommender for vehicle listings.
//! User interactions are weighted by type and recency, aggregated into a
//! sparse user-item matrix, and turned into item-item cosine similarity.
//! Attribute similarity and popularity cover cold items and cold users.

pub mod config;
pub mod error;
pub mod math;
pub mod recommend;
pub mod server;
pub mod storage;
pub mod types;
pub mod worker;

pub use config::{AppConfig, StorageMode};
pub use error::{AppError, Result};

pub use recommend::{EngineError, EngineStatus, FitReport, Recommender};
pub use storage::{AttributeFilter, InteractionSource, Stores, VehicleSource};
