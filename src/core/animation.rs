use async_trait::async_trait;
use std::time::Duration;
use crate::models::{Verdict, Viewport};

/// How far past the viewport edge a card flies, as a multiple of its size
const FLY_OFF_OVERSHOOT: f64 = 1.5;

/// One on-screen presentation of a candidate's card
///
/// A candidate that comes back after a failed decision is presented as a new
/// instance with a higher generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardInstance {
    pub candidate_id: String,
    pub generation: u64,
}

/// Exit trajectory of a resolved card
#[derive(Debug, Clone, PartialEq)]
pub struct FlyOff {
    pub card: CardInstance,
    pub verdict: Verdict,
    pub target_x: f64,
    pub target_y: f64,
    pub duration: Duration,
}

impl FlyOff {
    /// Trajectory continuing the drag direction until the card is off screen
    pub fn toward(card: CardInstance, verdict: Verdict, from: (f64, f64), viewport: Viewport, duration: Duration) -> Self {
        let (dx, dy) = from;
        let (target_x, target_y) = match verdict {
            Verdict::Like => (viewport.width * FLY_OFF_OVERSHOOT, dy),
            Verdict::Dislike => (-viewport.width * FLY_OFF_OVERSHOOT, dy),
            Verdict::SuperLike => (dx, -viewport.height * FLY_OFF_OVERSHOOT),
            Verdict::None => (0.0, 0.0),
        };

        Self {
            card,
            verdict,
            target_x,
            target_y,
            duration,
        }
    }
}

/// Renders card motion
///
/// Alternate visual styles implement this without touching decision logic.
/// Both methods resolve once the motion has finished on screen.
#[async_trait]
pub trait AnimationPresenter: Send + Sync {
    async fn fly_off(&self, path: &FlyOff);

    async fn spring_back(&self, card: &CardInstance, duration: Duration);
}

/// Presenter that only waits for the animation duration
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedPresenter;

#[async_trait]
impl AnimationPresenter for TimedPresenter {
    async fn fly_off(&self, path: &FlyOff) {
        tokio::time::sleep(path.duration).await;
    }

    async fn spring_back(&self, _card: &CardInstance, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Visual state of the top card
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationState {
    Idle,
    Dragging(CardInstance),
    Resolving {
        card: CardInstance,
        verdict: Verdict,
        animation_done: bool,
        recycled: bool,
    },
    Returning(CardInstance),
}

/// What the caller has to animate after a release
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    FlyOff(CardInstance, Verdict),
    SpringBack(CardInstance),
    /// Release while a fly-off is already running for this card
    InFlight(CardInstance),
    /// Nothing was being dragged
    Ignored,
}

/// State machine `Idle -> Dragging -> (Resolving | Returning) -> Idle`
///
/// Never starts a second fly-off for a card instance. `Resolving` only returns
/// to `Idle` after the animation has finished and the card has been recycled,
/// in whichever order those happen.
#[derive(Debug)]
pub struct SwipeAnimationController {
    state: AnimationState,
    next_generation: u64,
}

impl SwipeAnimationController {
    pub fn new() -> Self {
        Self {
            state: AnimationState::Idle,
            next_generation: 0,
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, AnimationState::Idle)
    }

    /// Handle a drag sample on the given candidate's card
    ///
    /// Returns the instance being dragged, or `None` while the card is flying off.
    pub fn begin_drag(&mut self, candidate_id: &str) -> Option<CardInstance> {
        match &self.state {
            AnimationState::Idle => {
                let card = CardInstance {
                    candidate_id: candidate_id.to_string(),
                    generation: self.next_generation,
                };
                self.next_generation += 1;
                tracing::trace!("Card {}#{} dragging", card.candidate_id, card.generation);
                self.state = AnimationState::Dragging(card.clone());
                Some(card)
            }
            AnimationState::Dragging(card) => Some(card.clone()),
            // Grabbing a card mid spring-back keeps the same instance
            AnimationState::Returning(card) => {
                let card = card.clone();
                self.state = AnimationState::Dragging(card.clone());
                Some(card)
            }
            AnimationState::Resolving { .. } => None,
        }
    }

    /// Handle the end of a drag with the classified verdict
    pub fn release(&mut self, verdict: Verdict) -> Transition {
        match &self.state {
            AnimationState::Dragging(card) => {
                let card = card.clone();
                if verdict.is_decision() {
                    tracing::debug!("Card {}#{} resolving as {}", card.candidate_id, card.generation, verdict);
                    self.state = AnimationState::Resolving {
                        card: card.clone(),
                        verdict,
                        animation_done: false,
                        recycled: false,
                    };
                    Transition::FlyOff(card, verdict)
                } else {
                    self.state = AnimationState::Returning(card.clone());
                    Transition::SpringBack(card)
                }
            }
            AnimationState::Resolving { card, .. } => Transition::InFlight(card.clone()),
            AnimationState::Idle | AnimationState::Returning(_) => Transition::Ignored,
        }
    }

    /// Record the fly-off finishing on screen
    ///
    /// Returns `true` exactly once per card instance.
    pub fn animation_finished(&mut self, finished: &CardInstance) -> bool {
        match &mut self.state {
            AnimationState::Resolving {
                card,
                animation_done,
                recycled,
                ..
            } if *card == *finished && !*animation_done => {
                *animation_done = true;
                if *recycled {
                    self.state = AnimationState::Idle;
                }
                true
            }
            _ => false,
        }
    }

    /// Record the feed having moved past the card
    pub fn recycled(&mut self, finished: &CardInstance) {
        if let AnimationState::Resolving {
            card,
            animation_done,
            recycled,
            ..
        } = &mut self.state
        {
            if *card == *finished {
                *recycled = true;
                if *animation_done {
                    self.state = AnimationState::Idle;
                }
            }
        }
    }

    /// Give up on a resolving card that is staying in the feed
    pub fn abandon(&mut self, finished: &CardInstance) {
        if let AnimationState::Resolving { card, .. } = &self.state {
            if *card == *finished {
                tracing::debug!("Card {}#{} abandoned, returning to rest", card.candidate_id, card.generation);
                self.state = AnimationState::Idle;
            }
        }
    }

    /// Record a spring-back finishing on screen
    pub fn spring_back_finished(&mut self, finished: &CardInstance) {
        if matches!(&self.state, AnimationState::Returning(card) if card == finished) {
            self.state = AnimationState::Idle;
        }
    }
}

impl Default for SwipeAnimationController {
    fn default() -> Self {
        Self::new()
    }
}
