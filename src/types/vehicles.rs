//! Vehicle attribute records owned by the catalog.

use serde::{Deserialize, Serialize};

/// Attributes of a listed vehicle used for content similarity and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Catalog identifier
    pub vehicle_id: String,
    /// Listing title (listings without one are not yet published)
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub price: Option<f32>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub drivetrain: Option<String>,
    /// Average review rating
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub mileage: Option<f32>,
}

impl VehicleRecord {
    /// Create a record with only an identifier set
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            title: None,
            brand: None,
            model: None,
            price: None,
            fuel_type: None,
            transmission: None,
            drivetrain: None,
            rating: None,
            mileage: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_price(mut self, price: f32) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = Some(fuel_type.into());
        self
    }

    pub fn with_transmission(mut self, transmission: impl Into<String>) -> Self {
        self.transmission = Some(transmission.into());
        self
    }

    pub fn with_drivetrain(mut self, drivetrain: impl Into<String>) -> Self {
        self.drivetrain = Some(drivetrain.into());
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_mileage(mut self, mileage: f32) -> Self {
        self.mileage = Some(mileage);
        self
    }
}

/// Per-vehicle popularity inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityRow {
    pub vehicle_id: String,
    /// Number of recorded interactions (all time)
    pub interaction_count: u64,
    pub rating: Option<f32>,
}
