//! Backend API Client
//!
//! REST operations consumed from the Lorebase backend: conversation
//! metadata, canonical transcripts, chunk detail, and recommendations.
//! The engine and side channel depend on the `BackendApi` trait, not on
//! this HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::models::chat::{Conversation, ConversationSummary};
use crate::models::chunk::{ChunkDetail, ChunkSuggestion};
use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Backend operations the chat core consumes
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// List conversation metadata for the sidebar
    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>>;

    /// Create a new conversation
    async fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary>;

    /// Rename a conversation
    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> AppResult<()>;

    /// Delete a conversation
    async fn delete_conversation(&self, conversation_id: &str) -> AppResult<()>;

    /// Fetch the canonical transcript of a conversation
    async fn fetch_conversation(&self, conversation_id: &str) -> AppResult<Conversation>;

    /// Fetch full detail for a document chunk
    async fn fetch_chunk(&self, chunk_id: &str) -> AppResult<ChunkDetail>;

    /// Fetch context suggestions for a draft query
    async fn recommendations(
        &self,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<ChunkSuggestion>>;
}

/// Build a `reqwest::Client` with the configured request timeout.
///
/// Streaming requests share this client; the timeout applies per read, not
/// to the whole stream, because `reqwest` enforces it on connect/response
/// head for streamed bodies.
pub fn build_http_client(config: &AppConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(AppError::from)
}

/// HTTP implementation of [`BackendApi`]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a backend client for the given base URL
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Create a backend client from the application configuration
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.server_url)
            .map_err(|e| AppError::config(format!("invalid server_url: {}", e)))?;
        Ok(Self::new(build_http_client(config)?, base_url))
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::internal(format!("bad endpoint {}: {}", path, e)))
    }

    /// Check the status and decode the JSON body
    async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(AppError::backend(status, body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Check the status of a body-less operation
    async fn expect_ok(response: reqwest::Response) -> AppResult<()> {
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        let response = self
            .client
            .get(self.endpoint("api/conversations")?)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    async fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary> {
        let response = self
            .client
            .post(self.endpoint("api/conversations")?)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        Self::expect_json(response).await
    }

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> AppResult<()> {
        let response = self
            .client
            .patch(self.endpoint(&format!("api/conversations/{}", conversation_id))?)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> AppResult<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("api/conversations/{}", conversation_id))?)
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> AppResult<Conversation> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/conversations/{}", conversation_id))?)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    async fn fetch_chunk(&self, chunk_id: &str) -> AppResult<ChunkDetail> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/chunks/{}", chunk_id))?)
            .send()
            .await?;
        Self::expect_json(response).await
    }

    async fn recommendations(
        &self,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<ChunkSuggestion>> {
        let response = self
            .client
            .get(self.endpoint("api/recommendations")?)
            .query(&[("query", query), ("limit", &limit.to_string())])
            .send()
            .await?;
        Self::expect_json(response).await
    }
}
