//! Backend API
//!
//! Trait seam and HTTP client for the backend REST operations.

pub mod client;

pub use client::{build_http_client, BackendApi, HttpBackend};
