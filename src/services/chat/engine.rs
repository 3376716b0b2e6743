//! Chat Engine
//!
//! Drives one turn at a time for the active conversation: optimistic
//! insert, stream consumption, error classification and rollback, and
//! canonical resynchronization once the turn ends.
//!
//! Three sources of truth meet here: the optimistic local transcript, the
//! live event stream, and the canonical transcript refetched after the
//! turn. The engine reconciles them by applying every event inside a short
//! non-suspending critical section, keyed against the conversation
//! activation under which the turn started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::chat::{ChatRole, ConversationSummary, Message};
use crate::services::api::BackendApi;
use crate::services::chat::segment::{split_segments, Segments};
use crate::services::chat::transcript::TranscriptStore;
use crate::services::recommend::RecommendationSideChannel;
use crate::services::streaming::{ChatTransport, StreamError, StreamEvent};
use crate::utils::error::AppResult;

/// Phase of the per-turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No turn in flight; sends are accepted
    Idle,
    /// Optimistic insert done, stream not yet open
    Sending,
    /// Events are being applied
    Streaming,
    /// Cleanup and canonical resync after the stream ended
    Finalizing,
}

/// How a send enters the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Append a new user message plus the assistant placeholder
    Fresh,
    /// The user message is already present; append only the placeholder
    ReplayUser,
}

/// How a turn ended; applied during the always-run finalize step
#[derive(Debug)]
enum TurnOutcome {
    /// `Done` arrived; the authoritative text is already in place
    Completed,
    /// Concurrency rejection (429): roll back to the pre-send snapshot
    Rejected,
    /// Transport failure: append a visible error suffix, keep partial text
    Failed(StreamError),
    /// The conversation was switched or reopened mid-turn; nothing more
    /// may be applied
    Orphaned,
}

/// Identity of one turn, captured at accept time
struct TurnTicket {
    conversation_id: String,
    /// Activation generation the turn was accepted under
    generation: u64,
    /// Transcript length before the optimistic insert
    baseline_len: usize,
}

/// Mutable engine state, locked only between suspension points
struct EngineState {
    active_conversation: Option<String>,
    /// Bumped on every conversation activation. A turn ticket carries the
    /// generation it was accepted under, so a stream orphaned by a switch
    /// stays orphaned even if the same conversation is reopened later.
    generation: u64,
    transcript: TranscriptStore,
    conversations: Vec<ConversationSummary>,
    phase: TurnPhase,
    /// Display split of the streaming message, recomputed on every delta
    live_segments: Option<Segments>,
}

/// Streaming conversation reconciliation engine.
///
/// One instance serves the whole UI; exactly one conversation is active at
/// a time and at most one turn runs on it.
pub struct ChatEngine {
    state: Arc<Mutex<EngineState>>,
    transport: Arc<dyn ChatTransport>,
    api: Arc<dyn BackendApi>,
    recommend: Arc<RecommendationSideChannel>,
    /// Shared with the side channel as its read-only turn awareness
    turn_active: Arc<AtomicBool>,
}

impl ChatEngine {
    /// Create an engine over the given transport, API, and side channel
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        api: Arc<dyn BackendApi>,
        recommend: Arc<RecommendationSideChannel>,
        turn_active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                active_conversation: None,
                generation: 0,
                transcript: TranscriptStore::new(),
                conversations: Vec::new(),
                phase: TurnPhase::Idle,
                live_segments: None,
            })),
            transport,
            api,
            recommend,
            turn_active,
        }
    }

    /// Activate a conversation, resetting all per-conversation state.
    ///
    /// A turn still streaming for the previous conversation becomes
    /// orphaned: its remaining events fail the ownership check and are
    /// discarded.
    pub async fn open_conversation(&self, conversation_id: &str) -> AppResult<()> {
        let generation = {
            let mut state = self.state.lock().await;
            state.active_conversation = Some(conversation_id.to_string());
            state.generation = state.generation.wrapping_add(1);
            state.phase = TurnPhase::Idle;
            state.transcript.clear();
            state.live_segments = None;
            state.generation
        };
        self.turn_active.store(false, Ordering::SeqCst);
        self.recommend.clear_query();

        let conversation = self.api.fetch_conversation(conversation_id).await?;
        let mut state = self.state.lock().await;
        if state.generation == generation {
            state.transcript.replace_all(conversation.messages);
        }
        Ok(())
    }

    /// Send the draft as a new turn on the active conversation.
    ///
    /// No-op while a turn is already in flight or when the draft is blank.
    pub async fn send_turn(&self, text: &str) -> AppResult<()> {
        self.send_turn_with(text, SendMode::Fresh).await
    }

    /// Resubmit text whose user message is already in the transcript.
    ///
    /// Appends only the assistant placeholder, so the user's turn is not
    /// duplicated.
    pub async fn resend_turn(&self, text: &str) -> AppResult<()> {
        self.send_turn_with(text, SendMode::ReplayUser).await
    }

    /// Retry the turn that produced the assistant message at `assistant_index`.
    ///
    /// Truncates the transcript through the nearest preceding user message
    /// and resubmits its text as a fresh turn, yielding a new user and
    /// assistant pair. No-op while a turn is in flight or when no user
    /// message precedes the index.
    pub async fn retry_from(&self, assistant_index: usize) -> AppResult<()> {
        // Truncation and acceptance happen under one lock so a rejected
        // retry can never leave the transcript truncated without a resend
        let accepted = {
            let mut state = self.state.lock().await;

            let found = {
                let messages = state.transcript.messages();
                if assistant_index >= messages.len() {
                    None
                } else {
                    (0..=assistant_index)
                        .rev()
                        .find(|&i| messages[i].role == ChatRole::User)
                        .map(|i| (i, messages[i].content.clone()))
                }
            };
            let Some((user_index, text)) = found else {
                tracing::debug!("retry rejected: no preceding user message");
                return Ok(());
            };

            Self::accept_turn(&mut state, &text, SendMode::Fresh, Some(user_index))
                .map(|ticket| (ticket, text))
        };
        let Some((ticket, text)) = accepted else {
            return Ok(());
        };

        self.run_turn(ticket, &text).await;
        Ok(())
    }

    /// Forward a draft change to the recommendation side channel
    pub fn on_draft_change(&self, text: &str) {
        self.recommend.on_draft_change(text);
    }

    /// Context suggestions currently offered for the draft
    pub fn suggestions(&self) -> Vec<crate::models::chunk::ChunkSuggestion> {
        self.recommend.suggestions()
    }

    /// Snapshot of the active transcript for rendering
    pub async fn transcript_snapshot(&self) -> Vec<Message> {
        self.state.lock().await.transcript.snapshot()
    }

    /// Conversation metadata list for the sidebar
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.state.lock().await.conversations.clone()
    }

    /// Current phase of the turn state machine
    pub async fn phase(&self) -> TurnPhase {
        self.state.lock().await.phase
    }

    /// Display split of the message currently streaming, if any
    pub async fn streaming_segments(&self) -> Option<Segments> {
        self.state.lock().await.live_segments.clone()
    }

    /// Refresh the conversation list from the backend
    pub async fn refresh_conversations(&self) -> AppResult<()> {
        let list = self.api.list_conversations().await?;
        self.state.lock().await.conversations = list;
        Ok(())
    }

    async fn send_turn_with(&self, text: &str, mode: SendMode) -> AppResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let ticket = {
            let mut state = self.state.lock().await;
            Self::accept_turn(&mut state, text, mode, None)
        };
        let Some(ticket) = ticket else {
            return Ok(());
        };

        self.run_turn(ticket, text).await;
        Ok(())
    }

    /// Guarded turn acceptance and optimistic insert.
    ///
    /// Runs inside the caller's critical section; `retry_truncate` is
    /// applied only once the guards have passed, so a rejection has no
    /// transcript side effects.
    fn accept_turn(
        state: &mut EngineState,
        text: &str,
        mode: SendMode,
        retry_truncate: Option<usize>,
    ) -> Option<TurnTicket> {
        if state.phase != TurnPhase::Idle {
            tracing::debug!("send rejected: turn already in flight");
            return None;
        }
        let Some(conversation_id) = state.active_conversation.clone() else {
            tracing::debug!("send rejected: no active conversation");
            return None;
        };

        state.phase = TurnPhase::Sending;
        if let Some(index) = retry_truncate {
            state.transcript.truncate_from(index);
        }
        let baseline_len = state.transcript.len();
        if mode == SendMode::Fresh {
            state.transcript.append(Message::user(text));
        }
        state.transcript.append(Message::streaming_placeholder());
        state.live_segments = Some(Segments::default());

        Some(TurnTicket {
            conversation_id,
            generation: state.generation,
            baseline_len,
        })
    }

    async fn run_turn(&self, ticket: TurnTicket, text: &str) {
        self.turn_active.store(true, Ordering::SeqCst);
        let outcome = self.run_stream(&ticket, text).await;
        self.finalize(&ticket, outcome).await;
    }

    /// Whether the turn's activation is still the current one. Keyed on the
    /// generation counter, not the conversation id: reopening the same
    /// conversation is a fresh activation and orphans the old stream.
    fn owns_turn(state: &EngineState, ticket: &TurnTicket) -> bool {
        state.generation == ticket.generation
    }

    /// Consume the stream, applying each event to the transcript.
    ///
    /// Every application re-checks that the turn's activation is still the
    /// current one; a switch orphans the stream and its remaining events.
    async fn run_stream(&self, ticket: &TurnTicket, text: &str) -> TurnOutcome {
        let mut stream = match self
            .transport
            .open_stream(&ticket.conversation_id, text)
            .await
        {
            Ok(stream) => stream,
            Err(e) if e.is_busy() => return TurnOutcome::Rejected,
            Err(e) => return TurnOutcome::Failed(e),
        };

        {
            let mut state = self.state.lock().await;
            if !Self::owns_turn(&state, ticket) {
                return TurnOutcome::Orphaned;
            }
            state.phase = TurnPhase::Streaming;
        }

        let mut accumulated = String::new();
        let mut saw_done = false;

        while let Some(pulled) = stream.next_event().await {
            let mut state = self.state.lock().await;
            if !Self::owns_turn(&state, ticket) {
                return TurnOutcome::Orphaned;
            }

            match pulled {
                Ok(StreamEvent::Sources(sources)) => {
                    state.transcript.replace_last(|m| m.sources = Some(sources));
                }
                Ok(StreamEvent::ContentDelta(delta)) => {
                    // The final text is authoritative; a delta arriving
                    // after it no longer affects content
                    if !saw_done {
                        accumulated.push_str(&delta);
                        state.live_segments = Some(split_segments(&accumulated));
                        let content = accumulated.clone();
                        state.transcript.replace_last(|m| m.content = content);
                    }
                }
                Ok(StreamEvent::Done(final_text)) => {
                    // The server's final value is ground truth; it replaces
                    // whatever the deltas accumulated
                    state.live_segments = Some(split_segments(&final_text));
                    state.transcript.replace_last(|m| {
                        m.content = final_text;
                        m.is_streaming = false;
                    });
                    saw_done = true;
                }
                Err(e) if e.is_busy() => return TurnOutcome::Rejected,
                Err(e) => return TurnOutcome::Failed(e),
            }
        }

        if saw_done {
            TurnOutcome::Completed
        } else {
            // A transport that ends without `done` and without raising is
            // still a dead stream
            TurnOutcome::Failed(StreamError::Network {
                message: "stream ended before completion".to_string(),
            })
        }
    }

    /// The finally-equivalent cleanup step: runs exactly once per turn.
    ///
    /// Applies the outcome to the transcript, resets the side channel, and
    /// resynchronizes with the canonical transcript and conversation list.
    /// For an orphaned turn the conversation switch already did the
    /// resetting, so everything here is skipped.
    async fn finalize(&self, ticket: &TurnTicket, outcome: TurnOutcome) {
        let owns = {
            let mut state = self.state.lock().await;
            let owns = Self::owns_turn(&state, ticket);
            if owns {
                state.phase = TurnPhase::Finalizing;
                match &outcome {
                    TurnOutcome::Rejected => {
                        // The send never happened as far as the user is
                        // concerned: restore the pre-send snapshot
                        state.transcript.truncate_from(ticket.baseline_len);
                    }
                    TurnOutcome::Failed(err) => {
                        let notice = format!("\n\n[Error: response interrupted: {}]", err);
                        state.transcript.replace_last(|m| {
                            if m.is_streaming {
                                m.content.push_str(&notice);
                                m.is_streaming = false;
                            }
                        });
                    }
                    TurnOutcome::Completed | TurnOutcome::Orphaned => {}
                }
                state.live_segments = None;
                self.turn_active.store(false, Ordering::SeqCst);
            }
            owns
        };

        if !owns {
            return;
        }

        self.recommend.clear_query();

        // Canonical resync; titles may have changed server-side as well.
        // Both fetches are guarded against a switch racing the await.
        match self.api.fetch_conversation(&ticket.conversation_id).await {
            Ok(conversation) => {
                let mut state = self.state.lock().await;
                if Self::owns_turn(&state, ticket) {
                    state.transcript.replace_all(conversation.messages);
                }
            }
            Err(e) => tracing::warn!("Canonical transcript refetch failed: {}", e),
        }
        match self.api.list_conversations().await {
            Ok(list) => {
                let mut state = self.state.lock().await;
                if Self::owns_turn(&state, ticket) {
                    state.conversations = list;
                }
            }
            Err(e) => tracing::warn!("Conversation list refresh failed: {}", e),
        }

        let mut state = self.state.lock().await;
        if Self::owns_turn(&state, ticket) && state.phase == TurnPhase::Finalizing {
            state.phase = TurnPhase::Idle;
        }
    }
}
