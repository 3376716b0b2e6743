//! Storage Layer
//!
//! Local persistence for application settings.

pub mod config;

pub use config::ConfigService;
