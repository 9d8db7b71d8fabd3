use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use crate::config::{SubmissionSettings, SwipeSettings};
use crate::core::animation::{AnimationPresenter, AnimationState, CardInstance, FlyOff, SwipeAnimationController, Transition};
use crate::core::classifier::ThresholdClassifier;
use crate::core::coordinator::{DecisionCoordinator, DecisionError};
use crate::core::events::{EventBus, SwipeEvent};
use crate::core::feed::FeedCursor;
use crate::core::gesture::GestureTracker;
use crate::models::{Candidate, FilterCriteria, GestureSample, MatchOutcome, Verdict, Viewport};
use crate::services::{DecisionService, ProfileFeed, ServiceError};

/// Explicit dependencies of a swipe session
#[derive(Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub feed: Arc<dyn ProfileFeed>,
    pub decisions: Arc<dyn DecisionService>,
}

/// What happened to a release, cancel or button press
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// The feed has nothing to decide on
    NoCandidate,
    /// No drag was in progress
    Ignored,
    /// The card is springing back to rest
    Returning { task: JoinHandle<()> },
    /// The card is already flying off with a decision in flight
    AlreadyInFlight(String),
    /// Fly-off and submission started; the task resolves once both finish
    Resolving {
        candidate_id: String,
        verdict: Verdict,
        task: JoinHandle<Result<MatchOutcome, DecisionError>>,
    },
}

#[derive(Debug, Clone)]
struct PendingRetry {
    candidate_id: String,
    verdict: Verdict,
}

/// Swipe session: gesture tracking, classification, card animation and
/// decision resolution for one user
///
/// A committed verdict starts the fly-off and the submission together. The
/// card only leaves the view after both have finished; a failed submission
/// brings it back to rest and offers a single retry.
///
/// Methods that start animations spawn onto the current tokio runtime.
pub struct SwipeEngine {
    feed: Arc<dyn ProfileFeed>,
    tracker: Mutex<GestureTracker>,
    classifier: ThresholdClassifier,
    animation: Mutex<SwipeAnimationController>,
    presenter: Arc<dyn AnimationPresenter>,
    coordinator: DecisionCoordinator,
    cursor: Arc<FeedCursor>,
    events: EventBus,
    retry: Mutex<Option<PendingRetry>>,
    viewport: Viewport,
    fly_off: Duration,
    spring_back: Duration,
}

impl SwipeEngine {
    pub fn new(
        context: SessionContext,
        viewport: Viewport,
        swipe: &SwipeSettings,
        submission: &SubmissionSettings,
        presenter: Arc<dyn AnimationPresenter>,
    ) -> Arc<Self> {
        let events = EventBus::new(submission.event_capacity);
        let cursor = Arc::new(FeedCursor::new());
        let coordinator = DecisionCoordinator::new(
            context.user_id,
            context.decisions,
            cursor.clone(),
            events.clone(),
            submission.timeout(),
        );

        Arc::new(Self {
            feed: context.feed,
            tracker: Mutex::new(GestureTracker::new(swipe.velocity_window())),
            classifier: ThresholdClassifier::for_viewport(viewport, swipe),
            animation: Mutex::new(SwipeAnimationController::new()),
            presenter,
            coordinator,
            cursor,
            events,
            retry: Mutex::new(None),
            viewport,
            fly_off: swipe.fly_off_duration(),
            spring_back: swipe.spring_back_duration(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwipeEvent> {
        self.events.subscribe()
    }

    pub fn coordinator(&self) -> &DecisionCoordinator {
        &self.coordinator
    }

    pub fn classifier(&self) -> &ThresholdClassifier {
        &self.classifier
    }

    pub fn current_candidate(&self) -> Option<Arc<Candidate>> {
        self.cursor.current()
    }

    pub fn exhausted(&self) -> bool {
        self.cursor.exhausted()
    }

    pub fn animation_state(&self) -> AnimationState {
        self.animation.lock().state().clone()
    }

    /// Whether a failed decision can still be retried
    pub fn can_retry(&self) -> bool {
        self.retry.lock().is_some()
    }

    /// Fetch candidates, skipping anyone already decided
    ///
    /// A candidate whose decision is still in flight stays in the feed, so a
    /// failed submission can be retried after the reload.
    pub async fn load_feed(&self, criteria: &FilterCriteria) -> Result<usize, ServiceError> {
        let excluded = self.coordinator.confirmed_ids();

        let mut criteria = criteria.clone();
        criteria.exclude_user_ids.extend(excluded.iter().cloned());

        let candidates = self.feed.fetch_candidates(&criteria).await?;
        self.cursor.load(candidates, &excluded);
        self.coordinator.celebration().reset();

        tracing::info!(
            "Feed ready for {}: {} candidates",
            self.coordinator.user_id(),
            self.cursor.remaining()
        );

        Ok(self.cursor.remaining())
    }

    /// Restart an exhausted feed without the candidates already decided on
    pub fn reset_feed(&self) {
        self.cursor.reset(&self.coordinator.confirmed_ids());
    }

    /// Feed a drag sample for the current card
    ///
    /// Returns `false` when there is no card or it is already flying off.
    pub fn pointer_move(&self, sample: GestureSample) -> bool {
        let Some(candidate) = self.cursor.current() else {
            return false;
        };

        if self.animation.lock().begin_drag(&candidate.id).is_none() {
            return false;
        }

        self.tracker.lock().push(sample);
        true
    }

    /// End the drag at time `at` (same clock as the samples) and act on the
    /// classified verdict
    pub fn release(self: &Arc<Self>, at: Duration) -> ReleaseOutcome {
        let sample = self.tracker.lock().release(at);
        let verdict = self.classifier.classify_release(&sample);

        tracing::debug!(
            "Release at ({:.1}, {:.1}) v=({:.1}, {:.1}) -> {}",
            sample.dx,
            sample.dy,
            sample.vx,
            sample.vy,
            verdict
        );

        self.conclude(verdict, (sample.dx, sample.dy))
    }

    /// Abort the drag; the card returns to rest
    pub fn cancel(self: &Arc<Self>) -> ReleaseOutcome {
        let sample = self.tracker.lock().cancel();
        self.conclude(Verdict::None, (sample.dx, sample.dy))
    }

    /// Decide without a drag (like / dislike / super-like buttons)
    pub fn decide(self: &Arc<Self>, verdict: Verdict) -> ReleaseOutcome {
        let Some(candidate) = self.cursor.current() else {
            return ReleaseOutcome::NoCandidate;
        };

        // A button press ends any drag in progress on this card
        {
            let mut tracker = self.tracker.lock();
            if tracker.is_active() {
                tracing::debug!("Dropping drag on {} for {} button", candidate.id, verdict);
            }
            tracker.cancel();
        }

        self.animation.lock().begin_drag(&candidate.id);
        self.conclude(verdict, (0.0, 0.0))
    }

    /// Resubmit the last failed decision, at most once
    pub fn retry(self: &Arc<Self>) -> ReleaseOutcome {
        let pending = self.retry.lock().take();
        let Some(pending) = pending else {
            return ReleaseOutcome::Ignored;
        };

        match self.cursor.current() {
            Some(current) if current.id == pending.candidate_id => {
                tracing::info!("Retrying {} for {}", pending.verdict, pending.candidate_id);
                self.decide(pending.verdict)
            }
            Some(_) => ReleaseOutcome::Ignored,
            None => ReleaseOutcome::NoCandidate,
        }
    }

    /// Move past the current card without deciding, e.g. after a failure
    pub fn skip(&self) -> bool {
        self.retry.lock().take();

        if !self.animation.lock().is_idle() {
            return false;
        }

        match self.cursor.current() {
            Some(current) => {
                tracing::debug!("Skipping {}", current.id);
                self.cursor.advance_past(&current.id)
            }
            None => false,
        }
    }

    fn conclude(self: &Arc<Self>, verdict: Verdict, from: (f64, f64)) -> ReleaseOutcome {
        let transition = self.animation.lock().release(verdict);

        match transition {
            Transition::Ignored => {
                if self.cursor.current().is_none() {
                    ReleaseOutcome::NoCandidate
                } else {
                    ReleaseOutcome::Ignored
                }
            }
            Transition::InFlight(card) => {
                tracing::debug!("Ignoring release on {}: already resolving", card.candidate_id);
                ReleaseOutcome::AlreadyInFlight(card.candidate_id)
            }
            Transition::SpringBack(card) => ReleaseOutcome::Returning {
                task: self.spawn_spring_back(card),
            },
            Transition::FlyOff(card, verdict) => {
                self.retry.lock().take();
                let candidate_id = card.candidate_id.clone();
                let path = FlyOff::toward(card, verdict, from, self.viewport, self.fly_off);

                ReleaseOutcome::Resolving {
                    candidate_id,
                    verdict,
                    task: self.spawn_resolution(path),
                }
            }
        }
    }

    fn spawn_spring_back(self: &Arc<Self>, card: CardInstance) -> JoinHandle<()> {
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            engine.presenter.spring_back(&card, engine.spring_back).await;
            engine.animation.lock().spring_back_finished(&card);
        })
    }

    fn spawn_resolution(self: &Arc<Self>, path: FlyOff) -> JoinHandle<Result<MatchOutcome, DecisionError>> {
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            let animation = async {
                engine.presenter.fly_off(&path).await;
                engine.animation.lock().animation_finished(&path.card);
            };
            let submission = engine.coordinator.submit(&path.card.candidate_id, path.verdict);

            // Completion order is arbitrary; the card waits for the later one
            let ((), result) = tokio::join!(animation, submission);

            engine.settle(&path.card, path.verdict, &result);
            result
        })
    }

    fn settle(&self, card: &CardInstance, verdict: Verdict, result: &Result<MatchOutcome, DecisionError>) {
        match result {
            Ok(_) => {
                self.animation.lock().recycled(card);
                self.events.emit(SwipeEvent::VerdictAnimationSettled {
                    candidate_id: card.candidate_id.clone(),
                });
            }
            Err(DecisionError::SubmissionFailed { .. }) => {
                *self.retry.lock() = Some(PendingRetry {
                    candidate_id: card.candidate_id.clone(),
                    verdict,
                });
                self.animation.lock().abandon(card);
            }
            Err(_) => self.animation.lock().abandon(card),
        }
    }
}
