use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::core::celebration::MatchCelebrationTrigger;
use crate::core::events::{EventBus, SwipeEvent};
use crate::core::feed::FeedCursor;
use crate::models::{Decision, DecisionState, MatchOutcome, SubmitDecisionResponse, Verdict};
use crate::services::{DecisionService, ServiceError};

/// Why a submission did not reach the server or was refused by it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionCause {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected decision ({0})")]
    Rejected(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Errors returned by [`DecisionCoordinator::submit`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("verdict `none` cannot be submitted")]
    NoVerdict,

    #[error("a decision for {0} is already in flight")]
    AlreadyInFlight(String),

    #[error("decision for {candidate_id} failed: {cause}")]
    SubmissionFailed {
        candidate_id: String,
        cause: SubmissionCause,
    },
}

impl DecisionError {
    /// Whether the UI may offer a retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionFailed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailed {
                cause: SubmissionCause::Timeout(_),
                ..
            }
        )
    }
}

#[derive(Debug, Default)]
struct DecisionLedger {
    pending: HashMap<String, Decision>,
    /// Latest finished decision per candidate
    resolved: HashMap<String, Decision>,
    confirmed: HashSet<String>,
}

/// Removes the pending entry however `submit` exits, including when its
/// future is dropped mid-flight
struct PendingLock<'a> {
    ledger: &'a Mutex<DecisionLedger>,
    candidate_id: &'a str,
}

impl Drop for PendingLock<'_> {
    fn drop(&mut self) {
        self.ledger.lock().pending.remove(self.candidate_id);
    }
}

/// Serialises decisions per candidate and resolves them against the
/// decision-submission service
///
/// At most one decision per candidate is `Pending` at any time; a second
/// submission for the same candidate fails fast with `AlreadyInFlight`
/// without reaching the service. Submissions for different candidates may
/// overlap.
pub struct DecisionCoordinator {
    user_id: String,
    service: Arc<dyn DecisionService>,
    cursor: Arc<FeedCursor>,
    celebration: MatchCelebrationTrigger,
    events: EventBus,
    timeout: Duration,
    ledger: Mutex<DecisionLedger>,
}

impl DecisionCoordinator {
    pub fn new(
        user_id: impl Into<String>,
        service: Arc<dyn DecisionService>,
        cursor: Arc<FeedCursor>,
        events: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            service,
            cursor,
            celebration: MatchCelebrationTrigger::new(events.clone()),
            events,
            timeout,
            ledger: Mutex::new(DecisionLedger::default()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Submit a verdict for a candidate and wait for the outcome
    ///
    /// On a confirmed outcome the feed moves past the candidate before the
    /// per-candidate lock is released. A failed submission leaves the feed
    /// untouched and is never retried automatically.
    pub async fn submit(&self, candidate_id: &str, verdict: Verdict) -> Result<MatchOutcome, DecisionError> {
        if !verdict.is_decision() {
            return Err(DecisionError::NoVerdict);
        }

        let mut decision = {
            let mut ledger = self.ledger.lock();
            if ledger.pending.contains_key(candidate_id) {
                tracing::debug!("Rejecting {} for {}: decision in flight", verdict, candidate_id);
                return Err(DecisionError::AlreadyInFlight(candidate_id.to_string()));
            }

            let decision = Decision::pending(candidate_id, verdict);
            ledger.pending.insert(candidate_id.to_string(), decision.clone());
            decision
        };
        let lock = PendingLock {
            ledger: &self.ledger,
            candidate_id,
        };

        tracing::debug!("Submitting {} for {} (decision {})", verdict, candidate_id, decision.id);

        let response = tokio::time::timeout(
            self.timeout,
            self.service.submit_decision(&self.user_id, candidate_id, verdict),
        )
        .await;

        let result = match response {
            Ok(response) => self.interpret(candidate_id, response),
            Err(_) => Err(DecisionError::SubmissionFailed {
                candidate_id: candidate_id.to_string(),
                cause: SubmissionCause::Timeout(self.timeout),
            }),
        };

        match &result {
            Ok(outcome) => {
                decision.state = DecisionState::Confirmed;
                self.ledger.lock().confirmed.insert(candidate_id.to_string());
                self.celebration.fire(outcome);
                self.cursor.advance_past(candidate_id);
                tracing::info!(
                    "Decision {} confirmed: {} -> {} (match: {})",
                    decision.id,
                    verdict,
                    candidate_id,
                    outcome.is_match
                );
            }
            Err(e) => {
                decision.state = DecisionState::Failed;
                tracing::warn!("Decision {} failed: {}", decision.id, e);
            }
        }

        self.ledger
            .lock()
            .resolved
            .insert(candidate_id.to_string(), decision);
        drop(lock);

        self.events.emit(SwipeEvent::DecisionResolved {
            candidate_id: candidate_id.to_string(),
            result: result.clone(),
        });

        result
    }

    fn interpret(
        &self,
        candidate_id: &str,
        response: Result<SubmitDecisionResponse, ServiceError>,
    ) -> Result<MatchOutcome, DecisionError> {
        let failed = |cause| DecisionError::SubmissionFailed {
            candidate_id: candidate_id.to_string(),
            cause,
        };

        match response {
            Ok(resp) if resp.success => {
                if resp.is_match.unwrap_or(false) {
                    Ok(MatchOutcome::matched(candidate_id, resp.match_id))
                } else {
                    Ok(MatchOutcome::no_match(candidate_id))
                }
            }
            Ok(resp) if resp.is_duplicate() => Ok(self.already_decided(candidate_id)),
            Ok(resp) => Err(failed(SubmissionCause::Rejected(
                resp.error_code.unwrap_or_else(|| "unknown".to_string()),
            ))),
            Err(ServiceError::AlreadyDecided) => Ok(self.already_decided(candidate_id)),
            Err(e) if e.is_timeout() => Err(failed(SubmissionCause::Timeout(self.timeout))),
            Err(e @ ServiceError::RequestError(_)) => Err(failed(SubmissionCause::Network(e.to_string()))),
            Err(e) => Err(failed(SubmissionCause::Server(e.to_string()))),
        }
    }

    fn already_decided(&self, candidate_id: &str) -> MatchOutcome {
        tracing::warn!(
            "Server already holds a decision from {} on {}, treating as confirmed",
            self.user_id,
            candidate_id
        );
        MatchOutcome::no_match(candidate_id)
    }

    pub fn is_pending(&self, candidate_id: &str) -> bool {
        self.ledger.lock().pending.contains_key(candidate_id)
    }

    /// Snapshot of the in-flight decision for a candidate
    pub fn pending_decision(&self, candidate_id: &str) -> Option<Decision> {
        self.ledger.lock().pending.get(candidate_id).cloned()
    }

    /// Last confirmed or failed decision for a candidate
    pub fn resolved_decision(&self, candidate_id: &str) -> Option<Decision> {
        self.ledger.lock().resolved.get(candidate_id).cloned()
    }

    pub fn celebration(&self) -> &MatchCelebrationTrigger {
        &self.celebration
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.lock().pending.len()
    }

    pub fn confirmed_ids(&self) -> HashSet<String> {
        self.ledger.lock().confirmed.clone()
    }
}
