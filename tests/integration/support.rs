//! Test Support
//!
//! Scripted fakes for the transport and backend seams, plus engine
//! assembly helpers shared across the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lorebase_desktop::models::chat::{ChatRole, Conversation, ConversationSummary, Message};
use lorebase_desktop::models::chunk::{ChunkDetail, ChunkSuggestion};
use lorebase_desktop::services::streaming::{ChatTransport, EventStream, StreamError, StreamEvent};
use lorebase_desktop::{AppError, AppResult, BackendApi, ChatEngine, RecommendationSideChannel};

/// One scripted response to an `open_stream` call
pub enum ScriptedOpen {
    /// Fail the open itself
    Fail(StreamError),
    /// Serve a fixed event sequence, then end
    Events(Vec<Result<StreamEvent, StreamError>>),
    /// Serve events fed live by the test through a channel
    Channel(mpsc::UnboundedReceiver<Result<StreamEvent, StreamError>>),
}

/// Transport fake serving one scripted stream per open, in order
pub struct FakeTransport {
    scripts: Mutex<VecDeque<ScriptedOpen>>,
    pub opens: AtomicUsize,
}

impl FakeTransport {
    pub fn new(scripts: Vec<ScriptedOpen>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn open_stream(
        &self,
        _conversation_id: &str,
        _text: &str,
    ) -> Result<Box<dyn EventStream>, StreamError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(ScriptedOpen::Fail(err)) => Err(err),
            Some(ScriptedOpen::Events(events)) => Ok(Box::new(ScriptedStream {
                events: events.into(),
            })),
            Some(ScriptedOpen::Channel(rx)) => Ok(Box::new(ChannelStream { rx })),
            None => Err(StreamError::Network {
                message: "no scripted stream left".to_string(),
            }),
        }
    }
}

struct ScriptedStream {
    events: VecDeque<Result<StreamEvent, StreamError>>,
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        self.events.pop_front()
    }
}

struct ChannelStream {
    rx: mpsc::UnboundedReceiver<Result<StreamEvent, StreamError>>,
}

#[async_trait]
impl EventStream for ChannelStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        self.rx.recv().await
    }
}

/// Backend fake with per-conversation canonical transcripts
pub struct FakeBackend {
    canonical: Mutex<HashMap<String, Conversation>>,
    summaries: Mutex<Vec<ConversationSummary>>,
    pub recommendation_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            canonical: Mutex::new(HashMap::new()),
            summaries: Mutex::new(Vec::new()),
            recommendation_calls: AtomicUsize::new(0),
        }
    }

    /// Install the canonical transcript served for a conversation
    pub fn set_canonical(&self, conversation: Conversation) {
        let mut summaries = self.summaries.lock().unwrap();
        summaries.retain(|s| s.id != conversation.id);
        summaries.push(ConversationSummary {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            updated_at: None,
        });
        self.canonical
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation);
    }

    /// Drop the canonical transcript so subsequent fetches fail
    pub fn remove_canonical(&self, conversation_id: &str) {
        self.canonical.lock().unwrap().remove(conversation_id);
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        Ok(self.summaries.lock().unwrap().clone())
    }

    async fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary> {
        let conversation = Conversation {
            id: format!("conv-{}", title),
            title: title.to_string(),
            messages: Vec::new(),
        };
        let summary = ConversationSummary {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            updated_at: None,
        };
        self.set_canonical(conversation);
        Ok(summary)
    }

    async fn rename_conversation(&self, _id: &str, _title: &str) -> AppResult<()> {
        Ok(())
    }

    async fn delete_conversation(&self, _id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> AppResult<Conversation> {
        self.canonical
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(conversation_id.to_string()))
    }

    async fn fetch_chunk(&self, chunk_id: &str) -> AppResult<ChunkDetail> {
        Err(AppError::not_found(chunk_id.to_string()))
    }

    async fn recommendations(
        &self,
        query: &str,
        _limit: usize,
    ) -> AppResult<Vec<ChunkSuggestion>> {
        self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ChunkSuggestion {
            chunk_id: format!("ch-{}", query),
            document_id: "d1".to_string(),
            filename: "notes.md".to_string(),
            preview: query.to_string(),
            score: 0.9,
        }])
    }
}

/// Canonical message with a server-assigned id
pub fn server_message(id: &str, role: ChatRole, content: &str) -> Message {
    Message {
        id: id.to_string(),
        role,
        content: content.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sources: None,
        is_streaming: false,
    }
}

/// Assemble an engine over the fakes, with a short side-channel debounce
pub fn engine_with(transport: Arc<FakeTransport>, backend: Arc<FakeBackend>) -> ChatEngine {
    let turn_active = Arc::new(AtomicBool::new(false));
    let recommend = Arc::new(RecommendationSideChannel::with_debounce(
        Arc::clone(&backend) as Arc<dyn BackendApi>,
        Arc::clone(&turn_active),
        5,
        Duration::from_millis(20),
    ));
    ChatEngine::new(transport, backend, recommend, turn_active)
}

/// Let spawned engine work make progress
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}
