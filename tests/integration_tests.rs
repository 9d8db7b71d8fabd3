// Integration tests for the swipe engine and decision coordinator

use async_trait::async_trait;
use lume_swipe::config::{SubmissionSettings, SwipeSettings};
use lume_swipe::core::{
    AnimationPresenter, AnimationState, CardInstance, DecisionCoordinator, DecisionError, EventBus,
    FeedCursor, FlyOff, ReleaseOutcome, SessionContext, SubmissionCause, SwipeEngine, SwipeEvent,
    TimedPresenter,
};
use lume_swipe::models::{
    Candidate, DecisionState, FilterCriteria, GestureSample, MatchOutcome, SubmitDecisionResponse, Verdict, Viewport,
};
use lume_swipe::services::{DecisionService, ProfileFeed, ServiceError};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio_test::{assert_err, assert_ok};

enum Scripted {
    Respond(SubmitDecisionResponse),
    Fail(ServiceError),
    /// Longer than any submission timeout
    Hang,
}

/// Decision service answering from a script, after a fixed delay
struct ScriptedService {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    submitted: Mutex<Vec<(String, Verdict)>>,
    delay: Duration,
    entered: Notify,
}

impl ScriptedService {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(vec![]),
            delay: Duration::from_secs(1),
            entered: Notify::new(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionService for ScriptedService {
    async fn submit_decision(
        &self,
        _user_id: &str,
        candidate_id: &str,
        verdict: Verdict,
    ) -> Result<SubmitDecisionResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push((candidate_id.to_string(), verdict));
        self.entered.notify_one();

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SubmitDecisionResponse::no_match())
            }
            Some(Scripted::Fail(e)) => {
                tokio::time::sleep(self.delay).await;
                Err(e)
            }
            Some(Scripted::Respond(response)) => {
                tokio::time::sleep(self.delay).await;
                Ok(response)
            }
            None => {
                tokio::time::sleep(self.delay).await;
                Ok(SubmitDecisionResponse::no_match())
            }
        }
    }
}

/// Feed returning a fixed list, minus excluded ids
struct StaticFeed {
    ids: Vec<&'static str>,
    requests: Mutex<Vec<FilterCriteria>>,
}

impl StaticFeed {
    fn new(ids: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            ids: ids.to_vec(),
            requests: Mutex::new(vec![]),
        })
    }
}

#[async_trait]
impl ProfileFeed for StaticFeed {
    async fn fetch_candidates(&self, criteria: &FilterCriteria) -> Result<Vec<Candidate>, ServiceError> {
        self.requests.lock().push(criteria.clone());
        Ok(self
            .ids
            .iter()
            .filter(|id| !criteria.exclude_user_ids.iter().any(|ex| ex == *id))
            .map(|id| Candidate::new(*id, json!({ "name": format!("User {}", id) })))
            .collect())
    }
}

/// Presenter counting the fly-offs it was asked to play
#[derive(Default)]
struct CountingPresenter {
    fly_offs: AtomicUsize,
}

#[async_trait]
impl AnimationPresenter for CountingPresenter {
    async fn fly_off(&self, path: &FlyOff) {
        self.fly_offs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(path.duration).await;
    }

    async fn spring_back(&self, _card: &CardInstance, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

async fn engine_with(
    feed: Arc<StaticFeed>,
    service: Arc<ScriptedService>,
    presenter: Arc<dyn AnimationPresenter>,
) -> Arc<SwipeEngine> {
    let context = SessionContext {
        user_id: "me".to_string(),
        feed,
        decisions: service,
    };

    let engine = SwipeEngine::new(
        context,
        Viewport::new(400.0, 800.0),
        &SwipeSettings::default(),
        &SubmissionSettings::default(),
        presenter,
    );
    engine.load_feed(&FilterCriteria::for_user("me")).await.unwrap();
    engine
}

/// Time of the last sample in `drag_right`
const LIFT: Duration = Duration::from_millis(500);

fn drag_right(engine: &SwipeEngine, dx: f64) {
    assert!(engine.pointer_move(GestureSample::new(0.0, 0.0, Duration::from_millis(0))));
    assert!(engine.pointer_move(GestureSample::new(dx / 2.0, 0.0, Duration::from_millis(250))));
    assert!(engine.pointer_move(GestureSample::new(dx, 0.0, Duration::from_millis(500))));
}

fn drain(rx: &mut broadcast::Receiver<SwipeEvent>) -> Vec<SwipeEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn match_events(events: &[SwipeEvent]) -> Vec<&MatchOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            SwipeEvent::Match(outcome) => Some(outcome),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_like_with_match_fires_once_and_advances() {
    let service = ScriptedService::new(vec![Scripted::Respond(SubmitDecisionResponse::matched("m1"))]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;
    let mut screen = engine.subscribe();
    let mut overlay = engine.subscribe();

    drag_right(&engine, 300.0);
    let ReleaseOutcome::Resolving { candidate_id, verdict, task } = engine.release(LIFT) else {
        panic!("expected the card to resolve");
    };
    assert_eq!(candidate_id, "c1");
    assert_eq!(verdict, Verdict::Like);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, MatchOutcome::matched("c1", Some("m1".to_string())));

    let events = drain(&mut screen);
    let matches = match_events(&events);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].match_id.as_deref(), Some("m1"));
    assert!(events.contains(&SwipeEvent::DecisionResolved {
        candidate_id: "c1".to_string(),
        result: Ok(outcome.clone()),
    }));
    assert_eq!(
        events.last(),
        Some(&SwipeEvent::VerdictAnimationSettled { candidate_id: "c1".to_string() })
    );

    // A second listener also sees exactly one celebration
    assert_eq!(match_events(&drain(&mut overlay)).len(), 1);

    assert_eq!(engine.current_candidate().unwrap().id, "c2");
    assert_eq!(engine.animation_state(), AnimationState::Idle);
    assert_eq!(service.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_candidate_and_releases_lock() {
    let service = ScriptedService::new(vec![
        Scripted::Hang,
        Scripted::Respond(SubmitDecisionResponse::no_match()),
    ]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;
    let mut rx = engine.subscribe();

    drag_right(&engine, 300.0);
    let ReleaseOutcome::Resolving { task, .. } = engine.release(LIFT) else {
        panic!("expected the card to resolve");
    };

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(
        err,
        DecisionError::SubmissionFailed {
            candidate_id: "c1".to_string(),
            cause: SubmissionCause::Timeout(Duration::from_secs(10)),
        }
    );

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SwipeEvent::DecisionResolved { candidate_id, result: Err(e) } if candidate_id == "c1" && e.is_retryable()
    )));
    assert!(!events.iter().any(|e| matches!(e, SwipeEvent::VerdictAnimationSettled { .. })));

    // Card is back on the same candidate and may be swiped again
    assert_eq!(engine.current_candidate().unwrap().id, "c1");
    assert_eq!(engine.animation_state(), AnimationState::Idle);
    assert!(engine.can_retry());
    assert!(!engine.coordinator().is_pending("c1"));

    drag_right(&engine, 300.0);
    let ReleaseOutcome::Resolving { task, .. } = engine.release(LIFT) else {
        panic!("expected the second swipe to resolve");
    };
    assert_ok!(task.await.unwrap());
    assert_eq!(engine.current_candidate().unwrap().id, "c2");
    assert_eq!(service.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_double_release_is_rejected_while_in_flight() {
    let presenter = Arc::new(CountingPresenter::default());
    let service = ScriptedService::new(vec![Scripted::Respond(SubmitDecisionResponse::no_match())]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), presenter.clone()).await;

    drag_right(&engine, 300.0);
    let ReleaseOutcome::Resolving { task, .. } = engine.release(LIFT) else {
        panic!("expected the card to resolve");
    };

    // The flying card ignores new samples, and further releases are no-ops
    assert!(!engine.pointer_move(GestureSample::new(250.0, 0.0, Duration::from_millis(10))));
    assert!(matches!(engine.release(LIFT), ReleaseOutcome::AlreadyInFlight(id) if id == "c1"));
    assert!(matches!(engine.decide(Verdict::Like), ReleaseOutcome::AlreadyInFlight(id) if id == "c1"));

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, MatchOutcome::no_match("c1"));
    assert_eq!(service.calls(), 1);
    assert_eq!(presenter.fly_offs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_drag_springs_back_without_submitting() {
    let service = ScriptedService::new(vec![]);
    let engine = engine_with(StaticFeed::new(&["c1"]), service.clone(), Arc::new(TimedPresenter)).await;

    // 60px over 500ms is neither far nor fast enough
    drag_right(&engine, 60.0);
    let ReleaseOutcome::Returning { task } = engine.release(LIFT) else {
        panic!("expected the card to spring back");
    };
    assert!(matches!(engine.animation_state(), AnimationState::Returning(_)));

    task.await.unwrap();
    assert_eq!(engine.animation_state(), AnimationState::Idle);
    assert_eq!(engine.current_candidate().unwrap().id, "c1");
    assert_eq!(service.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_gesture_returns_to_rest() {
    let service = ScriptedService::new(vec![]);
    let engine = engine_with(StaticFeed::new(&["c1"]), service.clone(), Arc::new(TimedPresenter)).await;

    drag_right(&engine, 300.0);
    let ReleaseOutcome::Returning { task } = engine.cancel() else {
        panic!("expected a cancelled gesture to spring back");
    };
    task.await.unwrap();

    assert_eq!(engine.current_candidate().unwrap().id, "c1");
    assert_eq!(service.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_offered_once_per_failure() {
    let service = ScriptedService::new(vec![
        Scripted::Fail(ServiceError::ApiError("Failed to create document in swipes: 500".to_string())),
        Scripted::Respond(SubmitDecisionResponse::matched("m7")),
    ]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;

    let ReleaseOutcome::Resolving { task, .. } = engine.decide(Verdict::SuperLike) else {
        panic!("expected the button press to resolve");
    };
    let err = assert_err!(task.await.unwrap());
    assert!(matches!(
        err,
        DecisionError::SubmissionFailed { cause: SubmissionCause::Server(_), .. }
    ));

    let ReleaseOutcome::Resolving { verdict, task, .. } = engine.retry() else {
        panic!("expected the retry to resolve");
    };
    assert_eq!(verdict, Verdict::SuperLike);
    assert!(matches!(engine.retry(), ReleaseOutcome::Ignored));

    let outcome = task.await.unwrap().unwrap();
    assert!(outcome.is_match);
    assert!(!engine.can_retry());
    assert_eq!(engine.current_candidate().unwrap().id, "c2");
}

#[tokio::test(start_paused = true)]
async fn test_skip_after_failure_moves_on() {
    let service = ScriptedService::new(vec![Scripted::Respond(SubmitDecisionResponse::rejected("validation"))]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;

    let ReleaseOutcome::Resolving { task, .. } = engine.decide(Verdict::Dislike) else {
        panic!("expected the button press to resolve");
    };
    assert!(task.await.unwrap().is_err());
    assert!(engine.can_retry());

    assert!(engine.skip());
    assert!(!engine.can_retry());
    assert_eq!(engine.current_candidate().unwrap().id, "c2");

    // Skipped candidates were never decided, so a reset offers them again
    engine.decide(Verdict::Dislike);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(engine.exhausted());
    engine.reset_feed();
    assert_eq!(engine.current_candidate().unwrap().id, "c1");
}

#[tokio::test(start_paused = true)]
async fn test_already_decided_advances_as_no_match() {
    let service = ScriptedService::new(vec![Scripted::Fail(ServiceError::AlreadyDecided)]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;
    let mut rx = engine.subscribe();

    let ReleaseOutcome::Resolving { task, .. } = engine.decide(Verdict::Like) else {
        panic!("expected the button press to resolve");
    };
    assert_eq!(task.await.unwrap(), Ok(MatchOutcome::no_match("c1")));
    assert_eq!(engine.current_candidate().unwrap().id, "c2");
    assert!(match_events(&drain(&mut rx)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reload_and_reset_exclude_decided_candidates() {
    let feed = StaticFeed::new(&["c1", "c2", "c3"]);
    let service = ScriptedService::new(vec![]);
    let engine = engine_with(feed.clone(), service.clone(), Arc::new(TimedPresenter)).await;

    for _ in 0..3 {
        let ReleaseOutcome::Resolving { task, .. } = engine.decide(Verdict::Dislike) else {
            panic!("expected the button press to resolve");
        };
        task.await.unwrap().unwrap();
        if engine.current_candidate().map(|c| c.id == "c3").unwrap_or(false) {
            break;
        }
    }
    assert_eq!(engine.current_candidate().unwrap().id, "c3");

    engine.reset_feed();
    assert_eq!(engine.current_candidate().unwrap().id, "c3");

    engine.load_feed(&FilterCriteria::for_user("me")).await.unwrap();
    assert_eq!(engine.current_candidate().unwrap().id, "c3");

    let last = feed.requests.lock().last().cloned().unwrap();
    let excluded: HashSet<String> = last.exclude_user_ids.into_iter().collect();
    assert!(excluded.contains("c1") && excluded.contains("c2"));
}

#[tokio::test(start_paused = true)]
async fn test_button_press_mid_drag_discards_the_drag() {
    let service = ScriptedService::new(vec![]);
    let engine = engine_with(StaticFeed::new(&["c1", "c2"]), service.clone(), Arc::new(TimedPresenter)).await;

    // Dragged far right, then the dislike button decides instead
    drag_right(&engine, 300.0);
    let ReleaseOutcome::Resolving { verdict, task, .. } = engine.decide(Verdict::Dislike) else {
        panic!("expected the button press to resolve");
    };
    assert_eq!(verdict, Verdict::Dislike);
    task.await.unwrap().unwrap();
    assert_eq!(engine.current_candidate().unwrap().id, "c2");

    // A small nudge on the next card, with its own clock starting again at zero
    assert!(engine.pointer_move(GestureSample::new(0.0, 0.0, Duration::from_millis(0))));
    assert!(engine.pointer_move(GestureSample::new(10.0, 0.0, Duration::from_millis(200))));
    let ReleaseOutcome::Returning { task } = engine.release(Duration::from_millis(200)) else {
        panic!("expected the nudge to spring back");
    };
    task.await.unwrap();

    assert_eq!(*service.submitted.lock(), vec![("c1".to_string(), Verdict::Dislike)]);
    assert_eq!(engine.current_candidate().unwrap().id, "c2");
}

#[tokio::test(start_paused = true)]
async fn test_flick_then_rest_springs_back() {
    let service = ScriptedService::new(vec![]);
    let engine = engine_with(StaticFeed::new(&["c1"]), service.clone(), Arc::new(TimedPresenter)).await;

    assert!(engine.pointer_move(GestureSample::new(0.0, 0.0, Duration::from_millis(0))));
    assert!(engine.pointer_move(GestureSample::new(50.0, 0.0, Duration::from_millis(50))));

    // Held still for two seconds before lifting
    let ReleaseOutcome::Returning { task } = engine.release(Duration::from_millis(2050)) else {
        panic!("expected a resting finger to spring back");
    };
    task.await.unwrap();
    assert_eq!(service.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reload_during_submission_keeps_candidate_for_retry() {
    let service = ScriptedService::new(vec![Scripted::Fail(ServiceError::ApiError("Failed to list swipes: 500".to_string()))]);
    let feed = StaticFeed::new(&["c1", "c2"]);
    let engine = engine_with(feed.clone(), service.clone(), Arc::new(TimedPresenter)).await;

    let ReleaseOutcome::Resolving { task, .. } = engine.decide(Verdict::Like) else {
        panic!("expected the button press to resolve");
    };

    // Reload while the decision on c1 is still in flight
    service.entered.notified().await;
    assert!(engine.coordinator().is_pending("c1"));
    engine.load_feed(&FilterCriteria::for_user("me")).await.unwrap();
    let last = feed.requests.lock().last().cloned().unwrap();
    assert!(!last.exclude_user_ids.contains(&"c1".to_string()));

    assert_err!(task.await.unwrap());
    assert_eq!(engine.current_candidate().unwrap().id, "c1");

    let ReleaseOutcome::Resolving { candidate_id, task, .. } = engine.retry() else {
        panic!("expected the retry to resolve");
    };
    assert_eq!(candidate_id, "c1");
    assert_ok!(task.await.unwrap());
    assert_eq!(engine.current_candidate().unwrap().id, "c2");
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_rejects_concurrent_submission_for_same_candidate() {
    let service = ScriptedService::new(vec![Scripted::Respond(SubmitDecisionResponse::matched("m1"))]);
    let cursor = Arc::new(FeedCursor::new());
    cursor.load(vec![Candidate::new("c1", json!({})), Candidate::new("c2", json!({}))], &HashSet::new());
    let events = EventBus::new(16);
    let mut rx = events.subscribe();

    let coordinator = DecisionCoordinator::new("me", service.clone(), cursor.clone(), events, Duration::from_secs(10));

    let (first, second) = tokio::join!(coordinator.submit("c1", Verdict::Like), async {
        service.entered.notified().await;
        assert!(coordinator.is_pending("c1"));
        assert_eq!(coordinator.pending_count(), 1);
        let pending = coordinator.pending_decision("c1").unwrap();
        assert_eq!(pending.state, DecisionState::Pending);
        assert_eq!(pending.verdict, Verdict::Like);
        coordinator.submit("c1", Verdict::Like).await
    });

    assert_eq!(second, Err(DecisionError::AlreadyInFlight("c1".to_string())));
    assert_eq!(first, Ok(MatchOutcome::matched("c1", Some("m1".to_string()))));
    assert_eq!(service.calls(), 1);
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(cursor.current().unwrap().id, "c2");
    assert_eq!(coordinator.resolved_decision("c1").unwrap().state, DecisionState::Confirmed);

    // The rejected duplicate is not broadcast; the real outcome is, once
    let resolved = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SwipeEvent::DecisionResolved { .. }))
        .count();
    assert_eq!(resolved, 1);
}

#[tokio::test(start_paused = true)]
async fn test_coordinator_allows_overlap_across_candidates() {
    let service = ScriptedService::new(vec![]);
    let cursor = Arc::new(FeedCursor::new());
    let coordinator = DecisionCoordinator::new("me", service.clone(), cursor, EventBus::default(), Duration::from_secs(10));

    let (a, b) = tokio::join!(
        coordinator.submit("c1", Verdict::Like),
        coordinator.submit("c2", Verdict::Dislike)
    );

    assert_ok!(a);
    assert_ok!(b);
    assert_eq!(service.calls(), 2);
    assert_eq!(coordinator.confirmed_ids().len(), 2);
}
