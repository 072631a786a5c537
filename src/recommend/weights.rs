//! Interaction weight table and exponential time decay.

use crate::types::{InteractionEvent, InteractionType};

/// Seconds in one day, used to express ages in days
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Default decay rate: weight = exp(-0.1 × days)
pub const DEFAULT_DECAY_LAMBDA: f32 = 0.1;

impl InteractionType {
    /// Base weight reflecting the strength of intent behind the action
    pub fn base_weight(&self) -> f32 {
        match self {
            Self::View => 1.0,
            Self::Click => 2.0,
            Self::Compare => 3.0,
            Self::Save | Self::Favorite => 4.0,
            Self::Contact | Self::Inquiry => 8.0,
            Self::Other(_) => 1.0,
        }
    }
}

/// Exponential decay anchored at a fixed evaluation time.
///
/// Ages are measured against `now`, not against other events, so
/// re-evaluating later ages every interaction even without new data.
#[derive(Debug, Clone, Copy)]
pub struct TimeDecay {
    /// Decay rate per day; must be positive
    pub lambda: f32,
    /// Evaluation time (Unix seconds)
    pub now: i64,
}

impl TimeDecay {
    pub fn new(lambda: f32, now: i64) -> Self {
        Self { lambda, now }
    }

    /// Fractional days between `timestamp` and `now`. Future timestamps are age 0.
    pub fn days_since(&self, timestamp: i64) -> f64 {
        (self.now.saturating_sub(timestamp) as f64 / SECONDS_PER_DAY).max(0.0)
    }

    /// Decay factor in (0, 1]
    pub fn factor(&self, timestamp: i64) -> f32 {
        (-(self.lambda as f64) * self.days_since(timestamp)).exp() as f32
    }

    /// Weight of one raw event in the interaction matrix.
    ///
    /// Weight = base_weight × time_decay × explicit_score
    pub fn event_score(&self, event: &InteractionEvent) -> f32 {
        event.interaction_type.base_weight()
            * self.factor(event.timestamp)
            * event.score_multiplier()
    }

    /// Weight of a history entry when expanding it into neighbors.
    /// Explicit scores do not apply here.
    pub fn contribution_weight(&self, interaction_type: &InteractionType, timestamp: i64) -> f32 {
        interaction_type.base_weight() * self.factor(timestamp)
    }
}
