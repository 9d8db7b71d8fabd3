// Swipe engine exports
pub mod animation;
pub mod celebration;
pub mod classifier;
pub mod coordinator;
pub mod engine;
pub mod events;
pub mod feed;
pub mod gesture;

pub use animation::{AnimationPresenter, AnimationState, CardInstance, FlyOff, SwipeAnimationController, TimedPresenter, Transition};
pub use celebration::MatchCelebrationTrigger;
pub use classifier::{classify, ThresholdClassifier};
pub use coordinator::{DecisionCoordinator, DecisionError, SubmissionCause};
pub use engine::{ReleaseOutcome, SessionContext, SwipeEngine};
pub use events::{EventBus, SwipeEvent};
pub use feed::FeedCursor;
pub use gesture::GestureTracker;
