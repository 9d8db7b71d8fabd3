// Service exports
pub mod appwrite;

pub use appwrite::{AppwriteClient, AppwriteCollections};

use async_trait::async_trait;
use thiserror::Error;
use crate::models::{Candidate, FilterCriteria, SubmitDecisionResponse, Verdict};

/// Errors reported by the remote collaborators
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Decision already recorded for this candidate")]
    AlreadyDecided,
}

impl ServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestError(e) if e.is_timeout())
    }
}

/// Source of the ordered candidate list
#[async_trait]
pub trait ProfileFeed: Send + Sync {
    /// Returns candidates already filtered and sorted by the backend
    async fn fetch_candidates(&self, criteria: &FilterCriteria) -> Result<Vec<Candidate>, ServiceError>;
}

/// Accepts swipe decisions and reports mutual interest
#[async_trait]
pub trait DecisionService: Send + Sync {
    async fn submit_decision(
        &self,
        user_id: &str,
        candidate_id: &str,
        verdict: Verdict,
    ) -> Result<SubmitDecisionResponse, ServiceError>;
}
