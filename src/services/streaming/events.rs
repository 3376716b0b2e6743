//! Stream Event Types
//!
//! Typed events decoded from the answer stream's newline-delimited JSON
//! chunks. The wire shape is kept separate from the event type consumed by
//! the engine so protocol drift stays contained here.

use serde::Deserialize;

use crate::models::chat::Source;

/// One chunk of the answer stream wire protocol.
///
/// Unrecognized `type` tags fail deserialization and are skipped by
/// [`decode_chunk`] rather than coerced into something else.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireChunk {
    /// Retrieval sources for the answer being generated
    Sources { data: Vec<Source> },
    /// A text delta to append to the accumulated answer
    Content { data: String },
    /// Authoritative final answer text
    Done { data: DonePayload },
}

#[derive(Debug, Deserialize)]
struct DonePayload {
    response: String,
}

/// A typed event pulled from the answer stream.
///
/// Transport failures are not an in-band variant; they surface as the `Err`
/// arm of the pull, so callers can tell a stream that ended after `Done`
/// from one that died mid-answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Retrieval sources to attach to the streaming message
    Sources(Vec<Source>),
    /// A content delta to append
    ContentDelta(String),
    /// Stream finished; carries the authoritative final text
    Done(String),
}

/// Decode one stream line into an event.
///
/// Returns `None` for blank lines and for undecodable chunks. Partial
/// content is still useful, so a malformed frame must not abort the turn.
pub fn decode_chunk(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<WireChunk>(trimmed) {
        Ok(WireChunk::Sources { data }) => Some(StreamEvent::Sources(data)),
        Ok(WireChunk::Content { data }) => Some(StreamEvent::ContentDelta(data)),
        Ok(WireChunk::Done { data }) => Some(StreamEvent::Done(data.response)),
        Err(e) => {
            tracing::warn!("Skipping undecodable stream chunk: {}", e);
            None
        }
    }
}
