//! Stream Client
//!
//! Opens the answer stream for a turn and exposes it as a lazy sequence of
//! typed events. Transport and HTTP concerns stay on this side of the
//! `ChatTransport` seam; the engine only ever sees `StreamEvent`s and
//! `StreamError`s.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use url::Url;

use super::events::{decode_chunk, StreamEvent};

/// Errors that can terminate an answer stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The backend refused the turn because one is already running for this
    /// conversation (HTTP 429). Recovered by rolling back the optimistic
    /// insert; never shown to the user.
    Busy,
    /// Non-success HTTP status other than 429
    Http { status: u16, message: String },
    /// Network failure, including a body that ended before `done`
    Network { message: String },
}

impl StreamError {
    /// Whether this is the concurrency-rejection signal
    pub fn is_busy(&self) -> bool {
        matches!(self, StreamError::Busy)
    }

    /// Map an HTTP status and response body to a stream error
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 {
            StreamError::Busy
        } else {
            StreamError::Http {
                status,
                message: body.to_string(),
            }
        }
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Busy => write!(f, "conversation is busy"),
            StreamError::Http { status, message } => {
                write!(f, "HTTP {}: {}", status, message)
            }
            StreamError::Network { message } => write!(f, "network error: {}", message),
        }
    }
}

impl std::error::Error for StreamError {}

/// A finite, pull-based sequence of stream events for one turn
#[async_trait]
pub trait EventStream: Send {
    /// Pull the next event, suspending until the transport yields one.
    ///
    /// `None` means the stream ended normally after `Done`; a failure
    /// before `Done` is delivered as `Some(Err(_))`.
    async fn next_event(&mut self) -> Option<Result<StreamEvent, StreamError>>;
}

/// Transport seam for opening answer streams
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a new answer stream for `text` on the given conversation.
    ///
    /// Not resumable; a retry means a fresh call.
    async fn open_stream(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Box<dyn EventStream>, StreamError>;
}

/// HTTP stream client against the Lorebase backend
pub struct StreamClient {
    client: reqwest::Client,
    base_url: Url,
}

impl StreamClient {
    /// Create a stream client for the given backend base URL
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn stream_url(&self, conversation_id: &str) -> Result<Url, StreamError> {
        self.base_url
            .join(&format!("api/conversations/{}/stream", conversation_id))
            .map_err(|e| StreamError::Network {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ChatTransport for StreamClient {
    async fn open_stream(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Box<dyn EventStream>, StreamError> {
        let url = self.stream_url(conversation_id)?;
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "message": text }))
            .send()
            .await
            .map_err(|e| StreamError::Network {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::from_status(status, &body));
        }

        Ok(Box::new(ChatStream::new(response.bytes_stream().boxed())))
    }
}

/// Line-buffered decoder over a streaming response body.
///
/// Chunk boundaries carry no meaning: a JSON frame, or even a single
/// multi-byte character within one, may arrive split across body chunks.
/// Raw bytes are buffered and split on the frame delimiter; UTF-8 decoding
/// happens per complete line, never per chunk.
pub struct ChatStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: BytesMut,
    saw_done: bool,
    finished: bool,
}

impl ChatStream {
    /// Wrap a raw body stream
    pub fn new(body: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            saw_done: false,
            finished: false,
        }
    }

    /// Decode the next complete buffered line, skipping undecodable ones
    fn next_buffered_event(&mut self) -> Option<StreamEvent> {
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(line_end + 1);
            let line = String::from_utf8_lossy(&line[..line_end]);

            if let Some(event) = decode_chunk(&line) {
                return Some(event);
            }
        }
        None
    }
}

#[async_trait]
impl EventStream for ChatStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(event) = self.next_buffered_event() {
                if matches!(event, StreamEvent::Done(_)) {
                    self.saw_done = true;
                }
                return Some(Ok(event));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(StreamError::Network {
                        message: e.to_string(),
                    }));
                }
                None => {
                    self.finished = true;
                    // Flush a trailing line that never got its newline
                    let rest = std::mem::take(&mut self.buffer);
                    let rest = String::from_utf8_lossy(&rest);
                    if let Some(event) = decode_chunk(&rest) {
                        if matches!(event, StreamEvent::Done(_)) {
                            self.saw_done = true;
                        }
                        return Some(Ok(event));
                    }
                    if self.saw_done {
                        return None;
                    }
                    return Some(Err(StreamError::Network {
                        message: "stream ended before completion".to_string(),
                    }));
                }
            }
        }
    }
}
