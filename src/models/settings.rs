//! Settings Models
//!
//! Application configuration and settings data structures.

use serde::{Deserialize, Serialize};

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the Lorebase backend
    pub server_url: String,
    /// Request timeout for REST calls, in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of context suggestions to fetch
    pub recommendation_limit: usize,
    /// Quiet period before a draft triggers a recommendation lookup, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub recommendation_debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8181".to_string(),
            request_timeout_secs: 30,
            recommendation_limit: 5,
            recommendation_debounce_ms: 500,
        }
    }
}

impl AppConfig {
    /// Validate the configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.server_url.trim().is_empty() {
            return Err("server_url must not be empty".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        if self.recommendation_limit == 0 {
            return Err("recommendation_limit must be positive".to_string());
        }
        Ok(())
    }

    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(url) = update.server_url {
            self.server_url = url;
        }
        if let Some(timeout) = update.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(limit) = update.recommendation_limit {
            self.recommendation_limit = limit;
        }
        if let Some(debounce) = update.recommendation_debounce_ms {
            self.recommendation_debounce_ms = debounce;
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub server_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub recommendation_limit: Option<usize>,
    pub recommendation_debounce_ms: Option<u64>,
}
