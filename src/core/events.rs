use tokio::sync::broadcast;
use crate::core::coordinator::DecisionError;
use crate::models::MatchOutcome;

/// Events exposed to the surrounding screen code
#[derive(Debug, Clone, PartialEq)]
pub enum SwipeEvent {
    /// The card finished its exit and has been recycled
    VerdictAnimationSettled { candidate_id: String },
    /// A submitted decision reached a terminal state
    DecisionResolved {
        candidate_id: String,
        result: Result<MatchOutcome, DecisionError>,
    },
    /// A confirmed mutual match, delivered once per decision
    Match(MatchOutcome),
}

/// Fan-out channel for [`SwipeEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SwipeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwipeEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SwipeEvent) {
        // No listeners is fine
        if self.sender.send(event).is_err() {
            tracing::trace!("Swipe event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
