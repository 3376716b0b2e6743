//! Chat Core
//!
//! Transcript ownership, reasoning segmentation, and the per-turn
//! reconciliation engine.

pub mod engine;
pub mod segment;
pub mod transcript;

pub use engine::{ChatEngine, SendMode, TurnPhase};
pub use segment::{split_segments, Segments, REASONING_CLOSE, REASONING_OPEN};
pub use transcript::TranscriptStore;
