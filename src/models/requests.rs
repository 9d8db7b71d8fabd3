use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::Verdict;

/// Criteria passed to the profile feed provider
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FilterCriteria {
    #[validate(length(min = 1))]
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "preferredGenders", default)]
    pub preferred_genders: Vec<String>,
    #[serde(rename = "minAge", default)]
    pub min_age: Option<u8>,
    #[serde(rename = "maxAge", default)]
    pub max_age: Option<u8>,
    #[serde(rename = "excludeUserIds", default)]
    pub exclude_user_ids: Vec<String>,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_limit")]
    pub limit: u16,
}

impl FilterCriteria {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferred_genders: vec![],
            min_age: None,
            max_age: None,
            exclude_user_ids: vec![],
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u16 {
    20
}

/// Swipe document written to the backend
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitDecisionRequest {
    #[validate(length(min = 1))]
    #[serde(rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(rename = "targetUserId")]
    pub target_user_id: String,
    pub action: Verdict,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}
