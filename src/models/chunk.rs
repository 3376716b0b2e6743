//! Chunk Models
//!
//! Document chunk detail and recommendation suggestion DTOs.

use serde::{Deserialize, Serialize};

/// Full detail of a document chunk, fetched when the user opens a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDetail {
    pub content: String,
    /// Id of the preceding chunk in the same document, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_chunk: Option<String>,
    /// Id of the following chunk in the same document, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_chunk: Option<String>,
    pub filename: String,
    pub title: String,
    pub chunk_index: u32,
    pub document_id: String,
}

/// A context suggestion returned by the recommendation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSuggestion {
    pub chunk_id: String,
    pub document_id: String,
    pub filename: String,
    pub preview: String,
    pub score: f64,
}
