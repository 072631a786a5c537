//! Vehicle recommendation engine.
//!
//! This module turns the interaction log into time-decayed user-item scores,
//! derives item-item cosine similarity from them, and answers similar-item,
//! personalized, popularity, candidate and hybrid queries. Content-based and
//! popularity paths cover items and users the collaborative index can't.

mod aggregate;
mod content;
mod engine;
mod filters;
mod similarity;
mod weights;

pub use aggregate::{AggregatedInteractions, IdIndex, InteractionAggregator, InteractionMatrix};
pub use content::{attribute_score, rank_by_attributes};
pub use engine::{
    EngineError, EngineSettings, EngineStatus, FitOutcome, FitReport, FitSnapshot, FitState,
    Recommender,
};
pub use filters::{apply_filters, validate_filter};
pub use similarity::ItemSimilarity;
pub use weights::{TimeDecay, DEFAULT_DECAY_LAMBDA};
