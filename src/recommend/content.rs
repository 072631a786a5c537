//! Attribute-based similarity for items the collaborative index cannot rank.
//!
//! Scores are additive so that partial matches still rank: each matching
//! dimension contributes its own bonus.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{Recommendation, VehicleRecord};

pub const BRAND_MATCH: f32 = 2.0;
pub const MODEL_MATCH: f32 = 1.5;
pub const PRICE_MATCH: f32 = 1.0;
pub const FUEL_TYPE_MATCH: f32 = 0.5;
pub const TRANSMISSION_MATCH: f32 = 0.5;
pub const DRIVETRAIN_MATCH: f32 = 0.3;

/// Relative price band counted as "similar price" (±30%)
pub const PRICE_TOLERANCE: f32 = 0.3;

fn same(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Additive attribute similarity of `candidate` to `reference`
pub fn attribute_score(reference: &VehicleRecord, candidate: &VehicleRecord) -> f32 {
    let mut score = 0.0;

    if same(&reference.brand, &candidate.brand) {
        score += BRAND_MATCH;
    }
    if same(&reference.model, &candidate.model) {
        score += MODEL_MATCH;
    }
    if let (Some(ref_price), Some(price)) = (reference.price, candidate.price) {
        let low = ref_price * (1.0 - PRICE_TOLERANCE);
        let high = ref_price * (1.0 + PRICE_TOLERANCE);
        if price >= low && price <= high {
            score += PRICE_MATCH;
        }
    }
    if same(&reference.fuel_type, &candidate.fuel_type) {
        score += FUEL_TYPE_MATCH;
    }
    if same(&reference.transmission, &candidate.transmission) {
        score += TRANSMISSION_MATCH;
    }
    if same(&reference.drivetrain, &candidate.drivetrain) {
        score += DRIVETRAIN_MATCH;
    }

    score
}

/// Higher rating first, missing ratings last
fn by_rating_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank catalog vehicles by attribute similarity to `reference`.
///
/// The reference itself, excluded ids, and vehicles without a brand are
/// never candidates. Ties go to the better-rated vehicle, then to the
/// smaller id.
pub fn rank_by_attributes(
    reference: &VehicleRecord,
    catalog: &[VehicleRecord],
    top_k: usize,
    exclude_ids: &HashSet<String>,
) -> Vec<Recommendation> {
    let mut scored: Vec<(&VehicleRecord, f32)> = catalog
        .iter()
        .filter(|v| v.vehicle_id != reference.vehicle_id)
        .filter(|v| !exclude_ids.contains(&v.vehicle_id))
        .filter(|v| v.brand.is_some())
        .map(|v| (v, attribute_score(reference, v)))
        .collect();

    scored.sort_by(|(va, sa), (vb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| by_rating_desc(va.rating, vb.rating))
            .then_with(|| va.vehicle_id.cmp(&vb.vehicle_id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(v, score)| Recommendation::new(v.vehicle_id.clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> VehicleRecord {
        VehicleRecord::new("ref")
            .with_brand("Toyota")
            .with_model("Camry")
            .with_price(20_000.0)
            .with_fuel_type("Gasoline")
            .with_transmission("Automatic")
            .with_drivetrain("FWD")
    }

    #[test]
    fn test_full_match_scores_all_dimensions() {
        let twin = VehicleRecord {
            vehicle_id: "twin".to_string(),
            ..reference()
        };
        assert!((attribute_score(&reference(), &twin) - 5.8).abs() < 1e-5);
    }

    #[test]
    fn test_partial_matches_are_additive() {
        let candidate = VehicleRecord::new("c")
            .with_brand("Toyota")
            .with_model("Corolla")
            .with_price(25_000.0)
            .with_transmission("Automatic");
        // brand + price (within 30%) + transmission
        assert!((attribute_score(&reference(), &candidate) - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_price_band_edges() {
        let inside = VehicleRecord::new("a").with_price(14_100.0);
        let outside = VehicleRecord::new("b").with_price(26_001.0);
        assert_eq!(attribute_score(&reference(), &inside), PRICE_MATCH);
        assert_eq!(attribute_score(&reference(), &outside), 0.0);
    }

    #[test]
    fn test_missing_attributes_never_match() {
        let bare = VehicleRecord::new("ref2");
        let other = VehicleRecord::new("x");
        assert_eq!(attribute_score(&bare, &other), 0.0);
    }

    #[test]
    fn test_rank_excludes_reference_and_exclusions() {
        let catalog = vec![
            reference(),
            VehicleRecord::new("a").with_brand("Toyota"),
            VehicleRecord::new("b").with_brand("Toyota").with_model("Camry"),
            VehicleRecord::new("c").with_brand("Honda"),
            VehicleRecord::new("nobrand").with_model("Camry"),
        ];
        let exclude = HashSet::from(["a".to_string()]);

        let ranked = rank_by_attributes(&reference(), &catalog, 10, &exclude);
        let ids: Vec<&str> = ranked.iter().map(|r| r.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!((ranked[0].score - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_rating_breaks_ties_nulls_last() {
        let catalog = vec![
            VehicleRecord::new("unrated").with_brand("Toyota"),
            VehicleRecord::new("low").with_brand("Toyota").with_rating(3.0),
            VehicleRecord::new("high").with_brand("Toyota").with_rating(4.8),
        ];
        let ranked = rank_by_attributes(&reference(), &catalog, 3, &HashSet::new());
        let ids: Vec<&str> = ranked.iter().map(|r| r.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "unrated"]);
    }

    #[test]
    fn test_rank_truncates_to_top_k() {
        let catalog: Vec<VehicleRecord> = (0..20)
            .map(|i| VehicleRecord::new(format!("v{i:02}")).with_brand("Ford"))
            .collect();
        assert_eq!(rank_by_attributes(&reference(), &catalog, 5, &HashSet::new()).len(), 5);
    }
}
