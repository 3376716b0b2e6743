//! Recommendation Side Channel
//!
//! Debounced context suggestions for the draft input. Runs independently of
//! the turn in flight: it never touches the transcript, and the engine only
//! ever resets it through `clear_query`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::models::chunk::ChunkSuggestion;
use crate::services::api::BackendApi;

/// Default quiet period before a draft triggers a lookup
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Default)]
struct SideChannelState {
    /// Live draft text, read again when the timer fires
    draft: String,
    /// Suggestions currently shown to the user
    suggestions: Vec<ChunkSuggestion>,
    /// The single pending debounce timer; arming a new one aborts this
    pending: Option<JoinHandle<()>>,
}

/// Debounced recommendation lookups for the current draft
pub struct RecommendationSideChannel {
    state: Arc<Mutex<SideChannelState>>,
    api: Arc<dyn BackendApi>,
    /// Read-only view of whether a turn is streaming; a fired timer skips
    /// its fetch while one is
    turn_active: Arc<AtomicBool>,
    debounce: Duration,
    limit: usize,
}

impl RecommendationSideChannel {
    /// Create a side channel with the default quiet period
    pub fn new(api: Arc<dyn BackendApi>, turn_active: Arc<AtomicBool>, limit: usize) -> Self {
        Self::with_debounce(api, turn_active, limit, DEFAULT_DEBOUNCE)
    }

    /// Create a side channel with an explicit quiet period
    pub fn with_debounce(
        api: Arc<dyn BackendApi>,
        turn_active: Arc<AtomicBool>,
        limit: usize,
        debounce: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SideChannelState::default())),
            api,
            turn_active,
            debounce,
            limit,
        }
    }

    /// Record a draft change and re-arm the debounce timer.
    ///
    /// An empty draft clears the shown suggestions synchronously, without
    /// waiting for any timer. Must be called from within a tokio runtime.
    pub fn on_draft_change(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.draft = text.to_string();

        if let Some(handle) = state.pending.take() {
            handle.abort();
        }

        if text.trim().is_empty() {
            state.suggestions.clear();
            return;
        }

        let shared = Arc::clone(&self.state);
        let api = Arc::clone(&self.api);
        let turn_active = Arc::clone(&self.turn_active);
        let debounce = self.debounce;
        let limit = self.limit;

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            // Look up the draft as it is now, not as it was at schedule time
            let query = { shared.lock().unwrap().draft.clone() };
            if query.trim().is_empty() {
                return;
            }
            if turn_active.load(Ordering::SeqCst) {
                return;
            }

            match api.recommendations(&query, limit).await {
                Ok(results) => {
                    let mut state = shared.lock().unwrap();
                    // A result for a superseded query is stale; drop it
                    if state.draft == query {
                        state.suggestions = results;
                    }
                }
                Err(e) => {
                    tracing::warn!("Recommendation lookup failed: {}", e);
                    let mut state = shared.lock().unwrap();
                    if state.draft == query {
                        state.suggestions.clear();
                    }
                }
            }
        }));
    }

    /// Suggestions currently available for rendering
    pub fn suggestions(&self) -> Vec<ChunkSuggestion> {
        self.state.lock().unwrap().suggestions.clone()
    }

    /// Reset the active query: disarm the timer, drop draft and suggestions.
    ///
    /// Called by the engine at turn finalization and on conversation switch.
    pub fn clear_query(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        state.draft.clear();
        state.suggestions.clear();
    }
}
