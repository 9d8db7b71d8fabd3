// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Candidate, GestureSample, ReleaseSample, Verdict, Decision, DecisionState, MatchOutcome, Viewport};
pub use requests::{FilterCriteria, SubmitDecisionRequest};
pub use responses::{SubmitDecisionResponse, DUPLICATE_DECISION_CODES};
