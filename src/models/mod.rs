//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod chat;
pub mod chunk;
pub mod settings;

pub use chat::{ChatRole, Conversation, ConversationSummary, Message, Source};
pub use chunk::{ChunkDetail, ChunkSuggestion};
pub use settings::{AppConfig, SettingsUpdate};
