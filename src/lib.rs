//! Lorebase Desktop - Rust Backend Library
//!
//! Backend library for the Lorebase desktop client: a chat interface over a
//! private document store. It includes:
//! - The streaming conversation reconciliation engine
//! - The answer-stream transport and wire-protocol decoding
//! - The backend REST API client
//! - The debounced recommendation side channel
//! - Settings storage, data models, and utilities
//!
//! The desktop shell (window management, IPC commands, packaging) lives in
//! the embedding application and consumes this crate.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::{AppConfig, ChatRole, Conversation, ConversationSummary, Message, SettingsUpdate, Source};
pub use models::{ChunkDetail, ChunkSuggestion};
pub use services::api::{BackendApi, HttpBackend};
pub use services::chat::{split_segments, ChatEngine, Segments, TranscriptStore, TurnPhase};
pub use services::recommend::RecommendationSideChannel;
pub use services::streaming::{ChatTransport, EventStream, StreamClient, StreamError, StreamEvent};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
