//! Data sources consumed by the recommendation engine.
//!
//! The engine reads from two collaborators:
//! - [`InteractionSource`]: the append-only interaction log
//! - [`VehicleSource`]: the vehicle catalog
//!
//! Implementations:
//! - [`MemoryStore`] (in-process, used for tests and ephemeral deployments)
//! - [`RedbStore`] (embedded file-based storage)

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{StorageConfig, StorageMode};
use crate::types::{InteractionEvent, PopularityRow, VehicleRecord};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Attribute predicates over vehicle records, combined with AND.
///
/// Unset fields do not constrain. Prices are inclusive bounds; a vehicle
/// without the constrained attribute never matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price_min: Option<f32>,
    #[serde(default)]
    pub price_max: Option<f32>,
    #[serde(default)]
    pub fuel_type: Option<String>,
}

impl AttributeFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact brand
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Require a price within the given bounds
    pub fn with_price_range(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    /// Require an exact fuel type
    pub fn with_fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = Some(fuel_type.into());
        self
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.fuel_type.is_none()
    }

    /// Evaluate the filter against one record
    pub fn matches(&self, vehicle: &VehicleRecord) -> bool {
        fn equals(expected: &Option<String>, actual: &Option<String>) -> bool {
            match expected {
                Some(expected) => actual.as_deref() == Some(expected.as_str()),
                None => true,
            }
        }

        let price_ok = match (vehicle.price, self.price_min, self.price_max) {
            (_, None, None) => true,
            (None, _, _) => false,
            (Some(price), min, max) => {
                min.map_or(true, |min| price >= min) && max.map_or(true, |max| price <= max)
            }
        };

        equals(&self.brand, &vehicle.brand) && equals(&self.fuel_type, &vehicle.fuel_type) && price_ok
    }
}

/// Append-only log of user interactions
#[async_trait]
pub trait InteractionSource: Send + Sync {
    /// All events with `timestamp >= since`, most recent first
    async fn events_since(&self, since: i64) -> Result<Vec<InteractionEvent>, StorageError>;

    /// A user's most recent events, most recent first
    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StorageError>;

    /// Record a new event
    async fn append(&self, event: InteractionEvent) -> Result<(), StorageError>;

    /// Total number of recorded events
    async fn count(&self) -> Result<u64, StorageError>;
}

/// Vehicle catalog
#[async_trait]
pub trait VehicleSource: Send + Sync {
    /// Point lookup of one vehicle's attributes
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<VehicleRecord>, StorageError>;

    /// Every catalog record
    async fn scan_vehicles(&self) -> Result<Vec<VehicleRecord>, StorageError>;

    /// Subset of `ids` whose records satisfy `filter`
    async fn filter_ids(
        &self,
        ids: &[String],
        filter: &AttributeFilter,
    ) -> Result<HashSet<String>, StorageError>;

    /// Interaction count and rating for every published vehicle
    async fn popularity(&self) -> Result<Vec<PopularityRow>, StorageError>;

    /// Insert or replace catalog records, returning how many were written
    async fn upsert_vehicles(&self, vehicles: Vec<VehicleRecord>) -> Result<usize, StorageError>;
}

/// Both data sources, backed by one storage implementation
#[derive(Clone)]
pub struct Stores {
    pub interactions: Arc<dyn InteractionSource>,
    pub vehicles: Arc<dyn VehicleSource>,
    pub mode: StorageMode,
}

impl Stores {
    /// Share one backend as both sources
    pub fn from_backend<S>(backend: Arc<S>, mode: StorageMode) -> Self
    where
        S: InteractionSource + VehicleSource + 'static,
    {
        Self {
            interactions: backend.clone(),
            vehicles: backend,
            mode,
        }
    }

    /// In-memory stores, empty
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()), StorageMode::Memory)
    }

    /// Open the backend selected by configuration
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        match config.mode {
            StorageMode::Memory => Ok(Self::in_memory()),
            StorageMode::File => {
                let store = RedbStore::open(&config.data_dir)?;
                Ok(Self::from_backend(Arc::new(store), StorageMode::File))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camry() -> VehicleRecord {
        VehicleRecord::new("v1")
            .with_brand("Toyota")
            .with_price(24_000.0)
            .with_fuel_type("Gasoline")
    }

    #[test]
    fn test_filter_builder() {
        let filter = AttributeFilter::new()
            .with_brand("Toyota")
            .with_price_range(Some(10_000.0), None)
            .with_fuel_type("Hybrid");

        assert!(!filter.is_empty());
        assert_eq!(filter.brand.as_deref(), Some("Toyota"));
        assert_eq!(filter.price_min, Some(10_000.0));
        assert!(filter.price_max.is_none());
        assert!(AttributeFilter::new().is_empty());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(AttributeFilter::new().matches(&camry()));
        assert!(AttributeFilter::new().matches(&VehicleRecord::new("bare")));
    }

    #[test]
    fn test_filter_predicates_are_anded() {
        let vehicle = camry();
        assert!(AttributeFilter::new().with_brand("Toyota").matches(&vehicle));
        assert!(!AttributeFilter::new().with_brand("Honda").matches(&vehicle));
        assert!(!AttributeFilter::new()
            .with_brand("Toyota")
            .with_fuel_type("Diesel")
            .matches(&vehicle));
    }

    #[test]
    fn test_price_bounds_inclusive() {
        let vehicle = camry();
        assert!(AttributeFilter::new()
            .with_price_range(Some(24_000.0), Some(24_000.0))
            .matches(&vehicle));
        assert!(!AttributeFilter::new()
            .with_price_range(None, Some(23_999.0))
            .matches(&vehicle));
    }

    #[test]
    fn test_missing_price_fails_price_filter() {
        let vehicle = VehicleRecord::new("v2").with_brand("Toyota");
        assert!(!AttributeFilter::new()
            .with_price_range(Some(1.0), None)
            .matches(&vehicle));
    }

    #[test]
    fn test_zero_price_bounds_are_constraints() {
        let unpriced = VehicleRecord::new("v2").with_brand("Toyota");
        assert!(!AttributeFilter::new()
            .with_price_range(Some(0.0), None)
            .matches(&unpriced));
        assert!(AttributeFilter::new()
            .with_price_range(Some(0.0), None)
            .matches(&camry()));
        assert!(!AttributeFilter::new()
            .with_price_range(None, Some(0.0))
            .matches(&camry()));
    }
}
