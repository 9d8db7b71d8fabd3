use crate::config::SwipeSettings;
use crate::models::{ReleaseSample, Verdict, Viewport};

/// Fraction of the screen width a drag must travel to commit
pub const DEFAULT_DISTANCE_RATIO: f64 = 0.25;

/// Release speed (px/s) that commits a swipe regardless of travel
pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 800.0;

/// Maximum sideways drift, as a fraction of the width, for a vertical flick
pub const DEFAULT_HORIZONTAL_TOLERANCE_RATIO: f64 = 0.2;

/// Maps a finished gesture to a verdict
///
/// Rules are evaluated in order, first match wins:
/// 1. Upward flick (far enough up while staying centered, or far enough up
///    and fast enough up) -> `SuperLike`
/// 2. Far enough or fast enough to the right -> `Like`
/// 3. Far enough or fast enough to the left -> `Dislike`
/// 4. Otherwise -> `None`, the card returns to rest
///
/// All comparisons are strict: a drag landing exactly on a threshold is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    pub distance_threshold: f64,
    pub velocity_threshold: f64,
    pub vertical_threshold: f64,
    pub horizontal_tolerance: f64,
}

impl ThresholdClassifier {
    /// Default thresholds for a screen of the given width
    pub fn with_width(screen_width: f64) -> Self {
        let distance_threshold = screen_width * DEFAULT_DISTANCE_RATIO;
        Self {
            distance_threshold,
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            vertical_threshold: distance_threshold,
            horizontal_tolerance: screen_width * DEFAULT_HORIZONTAL_TOLERANCE_RATIO,
        }
    }

    /// Thresholds derived from configuration for the given viewport
    pub fn for_viewport(viewport: Viewport, settings: &SwipeSettings) -> Self {
        let distance_threshold = viewport.width * settings.distance_ratio;
        let vertical_threshold = settings
            .vertical_ratio
            .map(|ratio| viewport.height * ratio)
            .unwrap_or(distance_threshold);

        Self {
            distance_threshold,
            velocity_threshold: settings.velocity_threshold,
            vertical_threshold,
            horizontal_tolerance: viewport.width * settings.horizontal_tolerance_ratio,
        }
    }

    pub fn classify(&self, dx: f64, dy: f64, vx: f64, vy: f64) -> Verdict {
        let vertical_flick = dy < -self.vertical_threshold && dx.abs() < self.horizontal_tolerance;
        let fast_upward = dy < -self.distance_threshold && vy < -self.velocity_threshold;

        if vertical_flick || fast_upward {
            Verdict::SuperLike
        } else if dx > self.distance_threshold || vx > self.velocity_threshold {
            Verdict::Like
        } else if dx < -self.distance_threshold || vx < -self.velocity_threshold {
            Verdict::Dislike
        } else {
            Verdict::None
        }
    }

    #[inline]
    pub fn classify_release(&self, release: &ReleaseSample) -> Verdict {
        self.classify(release.dx, release.dy, release.vx, release.vy)
    }
}

/// Classify with the default thresholds for `screen_width`
#[inline]
pub fn classify(dx: f64, dy: f64, vx: f64, vy: f64, screen_width: f64) -> Verdict {
    ThresholdClassifier::with_width(screen_width).classify(dx, dy, vx, vy)
}
