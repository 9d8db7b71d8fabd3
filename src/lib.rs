//! Lume Swipe - gesture engine and match resolution for the Lume dating app
//!
//! Turns card drags into like / dislike / super-like decisions, submits them
//! to the backend one at a time per candidate and reports matches back to the
//! screen code through an event stream.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{classify, DecisionCoordinator, DecisionError, FeedCursor, SessionContext, SwipeEngine, SwipeEvent};
pub use crate::models::{Candidate, GestureSample, MatchOutcome, Verdict, Viewport};
