//! Answer Streaming
//!
//! Wire-protocol decoding and the transport client for the per-turn answer
//! stream.

pub mod client;
pub mod events;

pub use client::{ChatStream, ChatTransport, EventStream, StreamClient, StreamError};
pub use events::{decode_chunk, StreamEvent};
