use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use crate::models::Candidate;

#[derive(Debug, Default)]
struct FeedState {
    /// Everything fetched, in provider order
    source: Vec<Arc<Candidate>>,
    /// What the cursor walks over
    queue: Vec<Arc<Candidate>>,
    index: usize,
}

/// Ordered candidate queue with a cursor
///
/// Never touches the network; every operation is a short critical section so
/// it can be called from the gesture path.
#[derive(Debug, Default)]
pub struct FeedCursor {
    state: Mutex<FeedState>,
}

impl FeedCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the feed with freshly fetched candidates, skipping excluded ids
    pub fn load(&self, candidates: Vec<Candidate>, excluding: &HashSet<String>) {
        let mut state = self.state.lock();
        state.source = candidates.into_iter().map(Arc::new).collect();
        state.queue = filtered(&state.source, excluding);
        state.index = 0;

        tracing::debug!(
            "Feed loaded: {} candidates, {} offered",
            state.source.len(),
            state.queue.len()
        );
    }

    pub fn current(&self) -> Option<Arc<Candidate>> {
        let state = self.state.lock();
        state.queue.get(state.index).cloned()
    }

    pub fn advance(&self) {
        let mut state = self.state.lock();
        if state.index < state.queue.len() {
            state.index += 1;
        }
    }

    /// Move past a decided candidate
    ///
    /// Advances if `candidate_id` is current. Otherwise the candidate is only
    /// dropped from the part of the queue not yet offered. Returns whether it
    /// was current.
    pub fn advance_past(&self, candidate_id: &str) -> bool {
        let mut state = self.state.lock();
        let is_current = state
            .queue
            .get(state.index)
            .is_some_and(|c| c.id == candidate_id);

        if is_current {
            state.index += 1;
        } else {
            let index = state.index;
            let mut position = 0;
            state.queue.retain(|c| {
                let keep = position < index || c.id != candidate_id;
                position += 1;
                keep
            });
        }
        is_current
    }

    pub fn exhausted(&self) -> bool {
        let state = self.state.lock();
        state.index >= state.queue.len()
    }

    pub fn remaining(&self) -> usize {
        let state = self.state.lock();
        state.queue.len().saturating_sub(state.index)
    }

    /// Restart from the head, skipping every excluded id
    pub fn reset(&self, excluding: &HashSet<String>) {
        let mut state = self.state.lock();
        state.queue = filtered(&state.source, excluding);
        state.index = 0;

        tracing::debug!("Feed reset: {} candidates offered", state.queue.len());
    }
}

fn filtered(source: &[Arc<Candidate>], excluding: &HashSet<String>) -> Vec<Arc<Candidate>> {
    source
        .iter()
        .filter(|c| !excluding.contains(&c.id))
        .cloned()
        .collect()
}
