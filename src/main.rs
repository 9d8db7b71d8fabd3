use lume_swipe::config::Settings;
use lume_swipe::core::{ReleaseOutcome, SessionContext, SwipeEngine, SwipeEvent, TimedPresenter};
use lume_swipe::models::{FilterCriteria, GestureSample, Viewport};
use lume_swipe::services::{AppwriteClient, AppwriteCollections};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// One recorded drag, as cumulative `[dx, dy, t_ms]` samples
#[derive(Debug, Deserialize)]
struct ScriptedGesture {
    #[serde(default)]
    samples: Vec<[f64; 3]>,
    #[serde(default)]
    cancel: bool,
    #[serde(rename = "retryOnFailure", default)]
    retry_on_failure: bool,
    /// When the finger lifted; defaults to the last sample
    #[serde(rename = "releaseMs", default)]
    release_ms: Option<u64>,
}

/// Gesture script replayed against the live backend
#[derive(Debug, Deserialize)]
struct GestureScript {
    gestures: Vec<ScriptedGesture>,
}

fn io_error(message: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}

fn log_event(event: &SwipeEvent) {
    match event {
        SwipeEvent::VerdictAnimationSettled { candidate_id } => {
            info!("Card settled: {}", candidate_id);
        }
        SwipeEvent::DecisionResolved { candidate_id, result: Ok(outcome) } => {
            info!("Decision resolved for {}: match={}", candidate_id, outcome.is_match);
        }
        SwipeEvent::DecisionResolved { candidate_id, result: Err(e) } => {
            warn!("Decision failed for {}: {}", candidate_id, e);
        }
        SwipeEvent::Match(outcome) => {
            info!("It's a match! {} ({:?})", outcome.candidate_id, outcome.match_id);
        }
    }
}

async fn replay(engine: &Arc<SwipeEngine>, index: usize, gesture: &ScriptedGesture) {
    for [dx, dy, t_ms] in &gesture.samples {
        engine.pointer_move(GestureSample::new(*dx, *dy, Duration::from_millis(*t_ms as u64)));
    }

    let lift = gesture
        .release_ms
        .or_else(|| gesture.samples.last().map(|[_, _, t_ms]| *t_ms as u64))
        .unwrap_or(0);

    let outcome = if gesture.cancel {
        engine.cancel()
    } else {
        engine.release(Duration::from_millis(lift))
    };

    match outcome {
        ReleaseOutcome::Resolving { candidate_id, verdict, task } => match task.await {
            Ok(Ok(outcome)) => {
                info!("Gesture {}: {} on {} (match: {})", index, verdict, candidate_id, outcome.is_match);
            }
            Ok(Err(e)) if gesture.retry_on_failure && engine.can_retry() => {
                warn!("Gesture {}: {}, retrying once", index, e);
                if let ReleaseOutcome::Resolving { task, .. } = engine.retry() {
                    if let Ok(Err(e)) = task.await {
                        warn!("Retry for {} failed: {}, skipping", candidate_id, e);
                        engine.skip();
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("Gesture {}: {}, skipping {}", index, e, candidate_id);
                engine.skip();
            }
            Err(e) => error!("Gesture {}: resolution task failed: {}", index, e),
        },
        ReleaseOutcome::Returning { task } => {
            if let Err(e) = task.await {
                error!("Gesture {}: spring-back task failed: {}", index, e);
            }
        }
        other => info!("Gesture {}: {:?}", index, other),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // Initialize logging; LOG_LEVEL / LOG_FORMAT override the logging section
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    let logging = logging.overridden(std::env::var("LOG_LEVEL").ok(), std::env::var("LOG_FORMAT").ok());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&logging.level))
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    let script_path = std::env::args()
        .nth(1)
        .ok_or_else(|| io_error("usage: lume-swipe <gesture-script.json>"))?;

    info!("Starting Lume swipe replay from {}", script_path);

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        io_error(format!("Configuration error: {}", e))
    })?;

    let script: GestureScript = serde_json::from_str(&std::fs::read_to_string(&script_path)?)
        .map_err(|e| io_error(format!("Invalid gesture script: {}", e)))?;

    let collections = AppwriteCollections {
        user_profiles: settings.collection.user_profiles.clone(),
        swipes: settings.collection.swipes.clone(),
        matches: settings.collection.matches.clone(),
    };

    let appwrite = Arc::new(
        AppwriteClient::new(
            settings.appwrite.endpoint.clone(),
            settings.appwrite.api_key.clone(),
            settings.appwrite.project_id.clone(),
            settings.appwrite.database_id.clone(),
            collections,
            Duration::from_secs(settings.appwrite.request_timeout_secs.unwrap_or(30)),
        )
        .map_err(io_error)?,
    );

    info!("Appwrite client initialized");

    let context = SessionContext {
        user_id: settings.session.user_id.clone(),
        feed: appwrite.clone(),
        decisions: appwrite,
    };
    let viewport = Viewport::new(settings.session.viewport_width, settings.session.viewport_height);

    let engine = SwipeEngine::new(
        context,
        viewport,
        &settings.swipe,
        &settings.submission,
        Arc::new(TimedPresenter),
    );

    info!("Swipe engine initialized with thresholds: {:?}", engine.classifier());

    let mut events = engine.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Event listener lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut criteria = FilterCriteria::for_user(settings.session.user_id.clone());
    if let Some(limit) = settings.session.feed_limit {
        criteria.limit = limit;
    }

    engine.load_feed(&criteria).await.map_err(|e| {
        error!("Failed to load candidate feed: {}", e);
        io_error(e)
    })?;

    for (index, gesture) in script.gestures.iter().enumerate() {
        if engine.exhausted() {
            info!("Feed exhausted, restarting without decided candidates");
            engine.reset_feed();
            if engine.exhausted() {
                info!("No candidates left");
                break;
            }
        }

        replay(&engine, index, gesture).await;
    }

    info!(
        "Replay finished: {} decisions confirmed",
        engine.coordinator().confirmed_ids().len()
    );

    // Closing the last sender ends the listener
    drop(engine);
    if let Err(e) = listener.await {
        error!("Event listener failed: {}", e);
    }

    Ok(())
}
