use parking_lot::Mutex;
use std::collections::HashSet;
use crate::core::events::{EventBus, SwipeEvent};
use crate::models::MatchOutcome;

/// One-shot match notifier
///
/// Delivers a `Match` event at most once per candidate until the next
/// [`reset`](Self::reset), however many times the caller asks.
#[derive(Debug)]
pub struct MatchCelebrationTrigger {
    events: EventBus,
    fired: Mutex<HashSet<String>>,
}

impl MatchCelebrationTrigger {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            fired: Mutex::new(HashSet::new()),
        }
    }

    /// Returns `true` if this call delivered the celebration
    pub fn fire(&self, outcome: &MatchOutcome) -> bool {
        if !outcome.is_match {
            return false;
        }

        if !self.fired.lock().insert(outcome.candidate_id.clone()) {
            tracing::debug!("Celebration for {} already fired", outcome.candidate_id);
            return false;
        }

        tracing::info!(
            "Match with {} (match id: {:?})",
            outcome.candidate_id,
            outcome.match_id
        );
        self.events.emit(SwipeEvent::Match(outcome.clone()));
        true
    }

    /// Forget celebrated candidates, e.g. when a new feed is loaded
    pub fn reset(&self) {
        self.fired.lock().clear();
    }

    pub fn fired_count(&self) -> usize {
        self.fired.lock().len()
    }
}
