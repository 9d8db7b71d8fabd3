use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// A profile the current user can decide on
///
/// Immutable once fetched. The display payload is opaque to the swipe engine
/// and is handed back untouched to whatever renders the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(rename = "displayFields", default)]
    pub display_fields: Value,
}

impl Candidate {
    pub fn new(id: impl Into<String>, display_fields: Value) -> Self {
        Self {
            id: id.into(),
            display_fields,
        }
    }

    /// Build a candidate from a backend document
    ///
    /// The document id (`$id`) wins over the `userId` attribute. Documents
    /// carrying neither are skipped.
    pub fn from_document(doc: &Value) -> Option<Self> {
        let data = doc.get("data").unwrap_or(doc);

        let id = doc
            .get("$id")
            .or_else(|| data.get("userId"))
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())?;

        Some(Self {
            id: id.to_string(),
            display_fields: data.clone(),
        })
    }
}

/// One pointer-move reading, cumulative from the start of the gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub dx: f64,
    pub dy: f64,
    pub t: Duration,
}

impl GestureSample {
    pub fn new(dx: f64, dy: f64, t: Duration) -> Self {
        Self { dx, dy, t }
    }
}

/// Final displacement and velocity (px/s) of a finished gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReleaseSample {
    pub dx: f64,
    pub dy: f64,
    pub vx: f64,
    pub vy: f64,
}

impl ReleaseSample {
    /// Synthetic sample emitted when a gesture is interrupted
    pub fn rest() -> Self {
        Self::default()
    }
}

/// Outcome of a completed drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Like,
    Dislike,
    SuperLike,
    None,
}

impl Verdict {
    /// Whether this verdict produces a decision (everything but `None`)
    pub fn is_decision(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Like and super-like both express interest
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Like | Self::SuperLike)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::SuperLike => "super_like",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionState {
    Pending,
    Confirmed,
    Failed,
}

/// A verdict submitted for remote evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub verdict: Verdict,
    #[serde(rename = "submittedAt")]
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub state: DecisionState,
}

impl Decision {
    pub fn pending(candidate_id: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id: candidate_id.into(),
            verdict,
            submitted_at: chrono::Utc::now(),
            state: DecisionState::Pending,
        }
    }
}

/// Result of a confirmed decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    #[serde(rename = "matchId", default)]
    pub match_id: Option<String>,
}

impl MatchOutcome {
    pub fn matched(candidate_id: impl Into<String>, match_id: Option<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            is_match: true,
            match_id,
        }
    }

    pub fn no_match(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            is_match: false,
            match_id: None,
        }
    }
}

/// Size of the surface the cards are dragged across, in px
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
