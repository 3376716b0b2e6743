//! Transcript Store
//!
//! Ordered message list for the active conversation. This is the single
//! mutable source the UI renders from while a turn is running; the engine
//! owns all mutation, the UI only ever reads snapshots.

use crate::models::chat::Message;

/// Owned, ordered message store with a narrow mutation API.
///
/// No operation suspends, so mutations are atomic with respect to the
/// engine's event loop. Only the final element is ever mutated in place;
/// `truncate_after` exists solely for the retry path.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message at the end
    pub fn append(&mut self, message: Message) {
        // At most one streaming message may exist at any instant
        debug_assert!(
            !message.is_streaming || self.messages.iter().all(|m| !m.is_streaming),
            "second streaming message appended"
        );
        self.messages.push(message);
    }

    /// Mutate the last message in place. O(1) in transcript length.
    ///
    /// No-op on an empty transcript.
    pub fn replace_last<F>(&mut self, mutate: F)
    where
        F: FnOnce(&mut Message),
    {
        if let Some(last) = self.messages.last_mut() {
            mutate(last);
        }
    }

    /// Remove every message after `index`, keeping `0..=index`
    pub fn truncate_after(&mut self, index: usize) {
        self.messages.truncate(index.saturating_add(1));
    }

    /// Remove every message, including `index` itself and later ones
    pub fn truncate_from(&mut self, index: usize) {
        self.messages.truncate(index);
    }

    /// Remove all messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replace the whole transcript with canonical messages
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Borrow the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Borrow the ordered messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Clone the ordered messages for rendering
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
