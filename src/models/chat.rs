//! Chat Models
//!
//! Messages, conversations, and retrieval sources for the chat transcript.

use serde::{Deserialize, Serialize};

/// Prefix marking a locally generated message id. Messages created by the
/// engine carry a temporary id until the canonical transcript is refetched.
const LOCAL_ID_PREFIX: &str = "local-";

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A retrieval source attached to an assistant answer.
///
/// Opaque to the engine: sources are forwarded from the stream to the
/// transcript unmodified and rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub chunk_id: String,
    pub document_id: String,
    pub filename: String,
    pub preview: String,
    pub score: f64,
}

/// A single message in a conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Locally unique id within the conversation
    pub id: String,
    pub role: ChatRole,
    /// Raw message text. For a streaming assistant message this is the
    /// accumulated undivided content; reasoning/answer segmentation is a
    /// display concern.
    pub content: String,
    /// Creation timestamp (ISO 8601)
    pub timestamp: String,
    /// Retrieval sources, present on answered assistant messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Whether this message is still receiving streamed content
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    /// Create a user message with a temporary local id
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: local_id(),
            role: ChatRole::User,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sources: None,
            is_streaming: false,
        }
    }

    /// Create the empty assistant placeholder appended at turn start
    pub fn streaming_placeholder() -> Self {
        Self {
            id: local_id(),
            role: ChatRole::Assistant,
            content: String::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sources: None,
            is_streaming: true,
        }
    }

    /// Whether the id is a local temporary id (not yet confirmed by the backend)
    pub fn has_local_id(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

fn local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4())
}

/// A full conversation as returned by the canonical transcript fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Conversation metadata for the sidebar list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    /// Last update timestamp (ISO 8601), used for sidebar ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
