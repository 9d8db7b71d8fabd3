use serde::{Deserialize, Serialize};

/// Error codes the backend uses for a swipe that already exists
pub const DUPLICATE_DECISION_CODES: &[&str] = &[
    "already_decided",
    "duplicate",
    "document_already_exists",
    "23505",
];

/// Response of the decision-submission service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDecisionResponse {
    pub success: bool,
    #[serde(rename = "isMatch", default)]
    pub is_match: Option<bool>,
    #[serde(rename = "matchId", default)]
    pub match_id: Option<String>,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

impl SubmitDecisionResponse {
    pub fn matched(match_id: impl Into<String>) -> Self {
        Self {
            success: true,
            is_match: Some(true),
            match_id: Some(match_id.into()),
            error_code: None,
        }
    }

    pub fn no_match() -> Self {
        Self {
            success: true,
            is_match: Some(false),
            match_id: None,
            error_code: None,
        }
    }

    pub fn rejected(code: impl Into<String>) -> Self {
        Self {
            success: false,
            is_match: None,
            match_id: None,
            error_code: Some(code.into()),
        }
    }

    /// Whether the server refused the swipe because it already exists
    pub fn is_duplicate(&self) -> bool {
        !self.success
            && self
                .error_code
                .as_deref()
                .is_some_and(|code| DUPLICATE_DECISION_CODES.contains(&code))
    }
}
