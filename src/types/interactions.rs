//! Interaction event types.
//!
//! Events are immutable once recorded. The engine only ever reads them.

use serde::{Deserialize, Serialize};

/// Kind of user action on a vehicle listing.
///
/// The vocabulary is fixed, but unknown types are preserved rather than
/// rejected so that new client actions do not break ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionType {
    View,
    Click,
    Compare,
    Save,
    Favorite,
    Contact,
    Inquiry,
    Other(String),
}

impl InteractionType {
    /// Wire name of the interaction type
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::Compare => "compare",
            Self::Save => "save",
            Self::Favorite => "favorite",
            Self::Contact => "contact",
            Self::Inquiry => "inquiry",
            Self::Other(name) => name,
        }
    }

    /// Past-tense phrase used when explaining a recommendation
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::View => "viewed",
            Self::Click => "clicked",
            Self::Compare => "compared",
            Self::Save => "saved",
            Self::Favorite => "favorited",
            Self::Contact => "contacted",
            Self::Inquiry => "inquired about",
            Self::Other(_) => "interacted with",
        }
    }
}

impl From<&str> for InteractionType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Self::View,
            "click" => Self::Click,
            "compare" => Self::Compare,
            "save" => Self::Save,
            "favorite" => Self::Favorite,
            "contact" => Self::Contact,
            "inquiry" => Self::Inquiry,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for InteractionType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<InteractionType> for String {
    fn from(value: InteractionType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded user action on a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// User who performed the action
    pub user_id: String,
    /// Vehicle the action targeted
    pub vehicle_id: String,
    /// Kind of action
    pub interaction_type: InteractionType,
    /// Optional explicit strength supplied by the client
    #[serde(default)]
    pub explicit_score: Option<f32>,
    /// Unix timestamp (seconds) when the action happened
    pub timestamp: i64,
}

impl InteractionEvent {
    pub fn new(
        user_id: impl Into<String>,
        vehicle_id: impl Into<String>,
        interaction_type: impl Into<InteractionType>,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            vehicle_id: vehicle_id.into(),
            interaction_type: interaction_type.into(),
            explicit_score: None,
            timestamp,
        }
    }

    /// Builder method to attach an explicit score
    pub fn with_score(mut self, score: f32) -> Self {
        self.explicit_score = Some(score);
        self
    }

    /// Explicit score multiplier. Missing or zero scores count as 1.0.
    pub fn score_multiplier(&self) -> f32 {
        match self.explicit_score {
            Some(score) if score != 0.0 => score,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(InteractionType::from("view"), InteractionType::View);
        assert_eq!(InteractionType::from("Contact"), InteractionType::Contact);
        assert_eq!(InteractionType::from(" inquiry "), InteractionType::Inquiry);
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let parsed = InteractionType::from("share");
        assert_eq!(parsed, InteractionType::Other("share".to_string()));
        assert_eq!(parsed.as_str(), "share");
        assert_eq!(parsed.past_tense(), "interacted with");
    }

    #[test]
    fn test_serde_uses_plain_strings() {
        let event = InteractionEvent::new("u1", "v1", "favorite", 1_700_000_000);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["interaction_type"], "favorite");

        let decoded: InteractionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.interaction_type, InteractionType::Favorite);
        assert_eq!(decoded.explicit_score, None);
    }

    #[test]
    fn test_score_multiplier_defaults() {
        let event = InteractionEvent::new("u1", "v1", "view", 0);
        assert_eq!(event.score_multiplier(), 1.0);
        assert_eq!(event.clone().with_score(0.0).score_multiplier(), 1.0);
        assert_eq!(event.with_score(2.5).score_multiplier(), 2.5);
    }
}
