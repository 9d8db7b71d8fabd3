use std::collections::VecDeque;
use std::time::Duration;
use crate::models::{GestureSample, ReleaseSample};

/// Default trailing window used for the release velocity
pub const DEFAULT_VELOCITY_WINDOW: Duration = Duration::from_millis(100);

/// Turns a stream of pointer-move readings into a final displacement and
/// release velocity
///
/// Samples carry the cumulative displacement since the gesture started, so the
/// velocity is the change in position across the trailing window divided by
/// the time it spans.
#[derive(Debug)]
pub struct GestureTracker {
    history: VecDeque<GestureSample>,
    window: Duration,
}

impl GestureTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            history: VecDeque::new(),
            window,
        }
    }

    /// Push a new reading into the tracker
    pub fn push(&mut self, sample: GestureSample) {
        // Timestamps must increase monotonically within one gesture
        if let Some(last) = self.history.back() {
            if sample.t < last.t {
                tracing::trace!(
                    "Ignoring gesture sample at {:?} earlier than last {:?}",
                    sample.t,
                    last.t
                );
                return;
            }
        }

        self.history.push_back(sample);
        self.trim_history();
    }

    /// Whether a gesture is in progress
    pub fn is_active(&self) -> bool {
        !self.history.is_empty()
    }

    /// Current cumulative displacement
    pub fn position(&self) -> (f64, f64) {
        self.history
            .back()
            .map(|s| (s.dx, s.dy))
            .unwrap_or((0.0, 0.0))
    }

    /// Velocity in px/s over the trailing window
    pub fn velocity(&self) -> (f64, f64) {
        match self.history.back() {
            Some(last) => self.velocity_at(last.t),
            None => (0.0, 0.0),
        }
    }

    /// Velocity in px/s over the window ending at `now`
    ///
    /// A pointer that has rested for longer than the window has no velocity.
    pub fn velocity_at(&self, now: Duration) -> (f64, f64) {
        let mut recent = self.history.iter().filter(|s| now <= s.t + self.window);
        let Some(first) = recent.next() else {
            return (0.0, 0.0);
        };
        let last = recent.last().unwrap_or(first);

        let elapsed = last.t.saturating_sub(first.t).as_secs_f64();
        if elapsed == 0.0 {
            return (0.0, 0.0);
        }

        ((last.dx - first.dx) / elapsed, (last.dy - first.dy) / elapsed)
    }

    /// End the gesture at time `at` and emit the final sample
    pub fn release(&mut self, at: Duration) -> ReleaseSample {
        let (dx, dy) = self.position();
        let (vx, vy) = self.velocity_at(at);
        self.history.clear();

        ReleaseSample { dx, dy, vx, vy }
    }

    /// Abort the gesture (e.g. interrupted by the system) and emit a rest sample
    pub fn cancel(&mut self) -> ReleaseSample {
        if self.is_active() {
            tracing::debug!("Gesture cancelled after {} samples", self.history.len());
        }
        self.history.clear();
        ReleaseSample::rest()
    }

    fn trim_history(&mut self) {
        let Some(&GestureSample { t, .. }) = self.history.back() else {
            return;
        };

        while let Some(first) = self.history.front() {
            if t <= first.t + self.window {
                break;
            }

            let _ = self.history.pop_front();
        }
    }
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_VELOCITY_WINDOW)
    }
}
