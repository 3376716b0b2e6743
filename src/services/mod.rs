//! Services
//!
//! Business logic: the chat reconciliation core, answer streaming, the
//! backend API client, and the recommendation side channel.

pub mod api;
pub mod chat;
pub mod recommend;
pub mod streaming;

pub use api::{BackendApi, HttpBackend};
pub use chat::{ChatEngine, TranscriptStore, TurnPhase};
pub use recommend::RecommendationSideChannel;
pub use streaming::{ChatTransport, StreamClient, StreamError, StreamEvent};
