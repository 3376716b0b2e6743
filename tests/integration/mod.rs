//! Integration Tests Module
//!
//! End-to-end tests for the chat reconciliation engine over scripted
//! transport and backend fakes. Tests cover streaming turn flow, failure
//! rollback and recovery, retry-by-truncation, and conversation switching.

// Shared fakes and assembly helpers
mod support;



// Retry and resend tests
mod engine_retry_test;
