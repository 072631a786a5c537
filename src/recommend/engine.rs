//! Recommendation engine: fit lifecycle and query operations.
//!
//! A fit builds a complete [`FitSnapshot`] off to the side and publishes it
//! with a single pointer swap. Queries clone the current `Arc` once and run
//! against it to completion, so a refresh can never expose a mix of old and
//! new state. Each fit attempt is stamped with a generation number; a result
//! older than the published one is discarded.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::aggregate::{IdIndex, InteractionAggregator};
use super::content::rank_by_attributes;
use super::filters::{apply_filters, validate_filter};
use super::similarity::ItemSimilarity;
use super::weights::{TimeDecay, DEFAULT_DECAY_LAMBDA};
use crate::config::EngineConfig;
use crate::storage::{AttributeFilter, InteractionSource, StorageError, Stores, VehicleSource};
use crate::types::{
    Algorithm, InteractionEvent, PopularityRow, Recommendation, Recommendations,
};

/// A later contribution takes over a candidate's explanation when it exceeds
/// this share of the candidate's running score. This is a heuristic, not a
/// guaranteed best explanation.
const REASON_SHARE: f32 = 0.5;

/// Share of hybrid slots given to personalized results, in tenths
const HYBRID_PERSONALIZED_TENTHS: usize = 7;

/// Extra popular results fetched so duplicates can be skipped
const HYBRID_POPULAR_SLACK: usize = 10;

const REASON_FALLBACK: &str = "Based on your preferences";
const REASON_POPULAR: &str = "Popular vehicle";
const REASON_TRENDING: &str = "Trending now";

/// Errors surfaced by engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(#[from] StorageError),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Fit generation {attempt} superseded by published generation {published}")]
    Superseded { attempt: u64, published: u64 },

    #[error("Internal engine error: {0}")]
    Internal(String),
}

/// Tunable engine parameters
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Default fit window in days
    pub lookback_days: u32,
    /// Time decay rate per day
    pub decay_lambda: f32,
    /// Most-recent events considered per user
    pub history_limit: usize,
    /// Neighbors fetched per history event
    pub neighbors_per_interaction: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            decay_lambda: DEFAULT_DECAY_LAMBDA,
            history_limit: 50,
            neighbors_per_interaction: 10,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            decay_lambda: config.decay_lambda,
            history_limit: config.history_limit,
            neighbors_per_interaction: config.neighbors_per_interaction,
        }
    }
}

/// Immutable result of one successful fit
#[derive(Debug)]
pub struct FitSnapshot {
    items: IdIndex,
    users: IdIndex,
    similarity: ItemSimilarity,
    generation: u64,
    fitted_at: i64,
    num_events: usize,
}

impl FitSnapshot {
    /// Aggregate events and derive item similarity. Returns `None` when no
    /// event falls inside the window.
    fn build(
        events: &[InteractionEvent],
        aggregator: InteractionAggregator,
        now: i64,
        generation: u64,
    ) -> Option<Self> {
        let aggregated = aggregator.aggregate(events, now);
        if aggregated.is_empty() {
            return None;
        }

        let similarity = ItemSimilarity::build(&aggregated.matrix);

        Some(Self {
            items: aggregated.items,
            users: aggregated.users,
            similarity,
            generation,
            fitted_at: now,
            num_events: aggregated.events_used,
        })
    }

    pub fn items(&self) -> &IdIndex {
        &self.items
    }

    pub fn similarity(&self) -> &ItemSimilarity {
        &self.similarity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rank every other indexed item by similarity to `vehicle_id`.
    /// Returns `None` if the vehicle is not indexed.
    fn similar(
        &self,
        vehicle_id: &str,
        top_k: usize,
        exclude_ids: &HashSet<String>,
    ) -> Option<Vec<Recommendation>> {
        let idx = self.items.get(vehicle_id)?;

        let mut ranked: Vec<(usize, f32)> = self
            .similarity
            .row(idx)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, _)| j != idx && !exclude_ids.contains(self.items.id(j)))
            .collect();

        // Index order follows id order, so ties resolve by vehicle id
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);

        Some(
            ranked
                .into_iter()
                .map(|(j, score)| Recommendation::new(self.items.id(j), score))
                .collect(),
        )
    }
}

/// Lifecycle state reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitState {
    Unfit,
    Fitting,
    Fitted,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: FitState,
    /// Generation of the published state (0 before any fit)
    pub generation: u64,
    pub num_items: usize,
    pub num_users: usize,
    pub fitted_at: Option<i64>,
}

/// How a completed fit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitOutcome {
    /// A new collaborative index was published
    Fitted,
    /// No interactions in the window; the engine now serves fallbacks only
    NoData,
}

/// Summary of a published fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub outcome: FitOutcome,
    pub generation: u64,
    pub lookback_days: u32,
    pub num_items: usize,
    pub num_users: usize,
    pub num_events: usize,
}

/// Currently published state
#[derive(Default)]
struct Published {
    snapshot: Option<Arc<FitSnapshot>>,
    generation: u64,
}

/// Tracks fits in progress for status reporting
struct FitGuard<'a>(&'a AtomicUsize);

impl<'a> FitGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, AtomicOrdering::SeqCst);
        Self(counter)
    }
}

impl Drop for FitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

/// Item-based collaborative filtering recommender with content and
/// popularity fallbacks
pub struct Recommender {
    interactions: Arc<dyn InteractionSource>,
    vehicles: Arc<dyn VehicleSource>,
    settings: EngineSettings,
    published: RwLock<Published>,
    next_generation: AtomicU64,
    fits_in_flight: AtomicUsize,
}

impl Recommender {
    pub fn new(
        interactions: Arc<dyn InteractionSource>,
        vehicles: Arc<dyn VehicleSource>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            interactions,
            vehicles,
            settings,
            published: RwLock::new(Published::default()),
            next_generation: AtomicU64::new(0),
            fits_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create an engine reading from both sources of `stores`
    pub fn from_stores(stores: &Stores, settings: EngineSettings) -> Self {
        Self::new(stores.interactions.clone(), stores.vehicles.clone(), settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current snapshot, if the engine is fitted
    pub async fn snapshot(&self) -> Option<Arc<FitSnapshot>> {
        self.published.read().await.snapshot.clone()
    }

    pub async fn is_fitted(&self) -> bool {
        self.published.read().await.snapshot.is_some()
    }

    pub async fn status(&self) -> EngineStatus {
        let published = self.published.read().await;
        let state = if self.fits_in_flight.load(AtomicOrdering::SeqCst) > 0 {
            FitState::Fitting
        } else if published.snapshot.is_some() {
            FitState::Fitted
        } else {
            FitState::Unfit
        };

        let snapshot = published.snapshot.as_ref();
        EngineStatus {
            state,
            generation: published.generation,
            num_items: snapshot.map_or(0, |s| s.items.len()),
            num_users: snapshot.map_or(0, |s| s.users.len()),
            fitted_at: snapshot.map(|s| s.fitted_at),
        }
    }

    /// Rebuild the index from the interaction window ending now
    pub async fn fit(&self, lookback_days: Option<u32>) -> Result<FitReport, EngineError> {
        self.fit_at(lookback_days, chrono::Utc::now().timestamp()).await
    }

    /// Rebuild the index with decay evaluated at `now`.
    ///
    /// On a source failure the published state is left untouched. An empty
    /// window publishes the unfit state.
    pub async fn fit_at(
        &self,
        lookback_days: Option<u32>,
        now: i64,
    ) -> Result<FitReport, EngineError> {
        let generation = self.next_generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let _guard = FitGuard::enter(&self.fits_in_flight);

        let lookback_days = lookback_days.unwrap_or(self.settings.lookback_days);
        let aggregator = InteractionAggregator::new(self.settings.decay_lambda, lookback_days);

        info!(generation, lookback_days, "Fitting recommendation engine");

        let events = self
            .interactions
            .events_since(aggregator.cutoff(now))
            .await
            .map_err(|e| {
                warn!(generation, error = %e, "Failed to load interactions, keeping previous state");
                EngineError::from(e)
            })?;

        let snapshot = if events.is_empty() {
            None
        } else {
            tokio::task::spawn_blocking(move || {
                FitSnapshot::build(&events, aggregator, now, generation)
            })
            .await
            .map_err(|e| EngineError::Internal(format!("Join error: {}", e)))?
        };

        self.publish(generation, lookback_days, snapshot).await
    }

    /// Swap in a fit result unless a newer generation is already live
    async fn publish(
        &self,
        generation: u64,
        lookback_days: u32,
        snapshot: Option<FitSnapshot>,
    ) -> Result<FitReport, EngineError> {
        let mut published = self.published.write().await;
        if generation < published.generation {
            warn!(
                generation,
                published = published.generation,
                "Discarding stale fit result"
            );
            return Err(EngineError::Superseded {
                attempt: generation,
                published: published.generation,
            });
        }

        let report = match &snapshot {
            Some(s) => FitReport {
                outcome: FitOutcome::Fitted,
                generation,
                lookback_days,
                num_items: s.items.len(),
                num_users: s.users.len(),
                num_events: s.num_events,
            },
            None => FitReport {
                outcome: FitOutcome::NoData,
                generation,
                lookback_days,
                num_items: 0,
                num_users: 0,
                num_events: 0,
            },
        };

        published.generation = generation;
        published.snapshot = snapshot.map(Arc::new);
        drop(published);

        match report.outcome {
            FitOutcome::Fitted => info!(
                generation,
                items = report.num_items,
                users = report.num_users,
                events = report.num_events,
                "Recommendation engine fitted"
            ),
            FitOutcome::NoData => warn!(
                generation,
                "No interactions found, serving content-based and popularity fallbacks"
            ),
        }

        Ok(report)
    }

    /// Vehicles similar to `vehicle_id`.
    ///
    /// Uses the collaborative index when the engine is fitted and the vehicle
    /// is indexed, otherwise attribute similarity.
    pub async fn similar_to(
        &self,
        vehicle_id: &str,
        top_k: usize,
        exclude_ids: &HashSet<String>,
    ) -> Result<Recommendations, EngineError> {
        let snapshot = self.snapshot().await;
        self.similar_in(snapshot.as_deref(), vehicle_id, top_k, exclude_ids)
            .await
    }

    /// Like [`similar_to`](Self::similar_to), but retries with attribute
    /// similarity when the collaborative path finds nothing
    pub async fn similar_with_fallback(
        &self,
        vehicle_id: &str,
        top_k: usize,
    ) -> Result<Recommendations, EngineError> {
        let exclude = HashSet::new();
        let recs = self.similar_to(vehicle_id, top_k, &exclude).await?;
        if recs.is_empty() && recs.algorithm == Algorithm::ItemBasedCf {
            return self.similar_by_attributes(vehicle_id, top_k, &exclude).await;
        }
        Ok(recs)
    }

    async fn similar_in(
        &self,
        snapshot: Option<&FitSnapshot>,
        vehicle_id: &str,
        top_k: usize,
        exclude_ids: &HashSet<String>,
    ) -> Result<Recommendations, EngineError> {
        if let Some(items) = snapshot.and_then(|s| s.similar(vehicle_id, top_k, exclude_ids)) {
            return Ok(Recommendations::new(Algorithm::ItemBasedCf, items));
        }

        debug!(vehicle_id, "Vehicle not in collaborative index, using attributes");
        self.similar_by_attributes(vehicle_id, top_k, exclude_ids)
            .await
    }

    /// Content-based similarity from catalog attributes
    pub async fn similar_by_attributes(
        &self,
        vehicle_id: &str,
        top_k: usize,
        exclude_ids: &HashSet<String>,
    ) -> Result<Recommendations, EngineError> {
        let Some(reference) = self.vehicles.get_vehicle(vehicle_id).await? else {
            return Ok(Recommendations::empty(Algorithm::ContentBased));
        };

        let catalog = self.vehicles.scan_vehicles().await?;
        Ok(Recommendations::new(
            Algorithm::ContentBased,
            rank_by_attributes(&reference, &catalog, top_k, exclude_ids),
        ))
    }

    /// Personalized recommendations from a user's recent history.
    ///
    /// Every history event expands into its neighbors, each weighted by the
    /// event's base weight and decay. Users without history get the
    /// popularity ranking.
    pub async fn recommend_for_user(
        &self,
        user_id: &str,
        top_k: usize,
        exclude_interacted: bool,
    ) -> Result<Recommendations, EngineError> {
        let history = self
            .interactions
            .recent_for_user(user_id, self.settings.history_limit)
            .await?;

        if history.is_empty() {
            debug!(user_id, "No interaction history, using popularity");
            return self.popular_vehicles(top_k).await;
        }

        let snapshot = self.snapshot().await;
        let decay = TimeDecay::new(self.settings.decay_lambda, chrono::Utc::now().timestamp());

        let exclude: HashSet<String> = if exclude_interacted {
            history.iter().map(|e| e.vehicle_id.clone()).collect()
        } else {
            HashSet::new()
        };

        let mut neighbors: HashMap<String, Recommendations> = HashMap::new();
        let mut scores: HashMap<String, f32> = HashMap::new();
        let mut reasons: HashMap<String, String> = HashMap::new();
        let mut used_cf = false;

        for event in &history {
            if !neighbors.contains_key(&event.vehicle_id) {
                let similar = self
                    .similar_in(
                        snapshot.as_deref(),
                        &event.vehicle_id,
                        self.settings.neighbors_per_interaction,
                        &exclude,
                    )
                    .await?;
                neighbors.insert(event.vehicle_id.clone(), similar);
            }
            let Some(similar) = neighbors.get(&event.vehicle_id) else {
                continue;
            };
            used_cf |= similar.algorithm == Algorithm::ItemBasedCf;

            let weight = decay.contribution_weight(&event.interaction_type, event.timestamp);
            for candidate in &similar.items {
                let contribution = weight * candidate.score;
                let total = {
                    let entry = scores.entry(candidate.vehicle_id.clone()).or_insert(0.0);
                    *entry += contribution;
                    *entry
                };

                if !reasons.contains_key(&candidate.vehicle_id)
                    || contribution > total * REASON_SHARE
                {
                    reasons.insert(
                        candidate.vehicle_id.clone(),
                        format!(
                            "Similar to vehicles you {}",
                            event.interaction_type.past_tense()
                        ),
                    );
                }
            }
        }

        let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);

        let items = ranked
            .into_iter()
            .map(|(vehicle_id, score)| {
                let reason = reasons
                    .remove(&vehicle_id)
                    .unwrap_or_else(|| REASON_FALLBACK.to_string());
                Recommendation::new(vehicle_id, score).with_reason(reason)
            })
            .collect();

        let algorithm = if used_cf {
            Algorithm::ItemBasedCf
        } else {
            Algorithm::ContentBased
        };

        Ok(Recommendations::new(algorithm, items))
    }

    /// Vehicles ranked by interaction count plus rating
    pub async fn popular_vehicles(&self, top_k: usize) -> Result<Recommendations, EngineError> {
        let rows = self.vehicles.popularity().await?;
        Ok(Recommendations::new(
            Algorithm::Popularity,
            rank_by_popularity(rows, top_k),
        ))
    }

    /// Two-stage candidate generation: over-generate, then filter.
    pub async fn candidates(
        &self,
        user_id: Option<&str>,
        filter: Option<&AttributeFilter>,
        top_k: usize,
    ) -> Result<Recommendations, EngineError> {
        if let Some(filter) = filter {
            validate_filter(filter)?;
        }

        let pool = top_k.saturating_mul(2);
        let stage_one = match user_id {
            Some(user_id) => self.recommend_for_user(user_id, pool, true).await?,
            None => self.popular_vehicles(pool).await?,
        };

        let mut items = match filter {
            Some(filter) => apply_filters(stage_one.items, filter, self.vehicles.as_ref()).await?,
            None => stage_one.items,
        };
        items.truncate(top_k);

        Ok(Recommendations::new(
            Algorithm::HybridCandidateGeneration,
            items,
        ))
    }

    /// Personalized results topped up with popular vehicles.
    ///
    /// With a user, 70% of the slots go to personalized results; the rest
    /// (or all, without a user) are filled from the popularity ranking.
    pub async fn hybrid(
        &self,
        user_id: Option<&str>,
        top_k: usize,
    ) -> Result<Recommendations, EngineError> {
        let personalized_limit = match user_id {
            Some(_) => top_k * HYBRID_PERSONALIZED_TENTHS / 10,
            None => 0,
        };
        let popular_limit = top_k - personalized_limit;

        let mut items = Vec::with_capacity(top_k);
        let mut seen = HashSet::new();

        if let (Some(user_id), true) = (user_id, personalized_limit > 0) {
            for rec in self
                .recommend_for_user(user_id, personalized_limit, true)
                .await?
                .items
            {
                if seen.insert(rec.vehicle_id.clone()) {
                    items.push(rec);
                }
            }
        }

        for rec in self
            .popular_vehicles(popular_limit + HYBRID_POPULAR_SLACK)
            .await?
            .items
        {
            if items.len() >= top_k {
                break;
            }
            if seen.insert(rec.vehicle_id.clone()) {
                items.push(rec.with_reason(REASON_TRENDING));
            }
        }

        Ok(Recommendations::new(Algorithm::Hybrid, items))
    }
}

/// Higher rating first, missing ratings last
fn rating_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank by `interaction_count + rating`, ties by rating then id
fn rank_by_popularity(rows: Vec<PopularityRow>, top_k: usize) -> Vec<Recommendation> {
    let mut scored: Vec<(PopularityRow, f32)> = rows
        .into_iter()
        .map(|row| {
            let score = row.interaction_count as f32 + row.rating.unwrap_or(0.0);
            (row, score)
        })
        .collect();

    scored.sort_by(|(ra, sa), (rb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| rating_desc(ra.rating, rb.rating))
            .then_with(|| ra.vehicle_id.cmp(&rb.vehicle_id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(row, score)| Recommendation::new(row.vehicle_id, score).with_reason(REASON_POPULAR))
        .collect()
}
