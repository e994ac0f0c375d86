//! Ollama HTTP client.
//!
//! Speaks the two endpoints the session needs: `GET /api/tags` to list
//! installed models and `POST /api/generate` with `stream: false`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ModelGateway, ModelInfo};
use crate::error::NetworkError;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Gateway backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    details: Option<TagDetails>,
}

#[derive(Deserialize)]
struct TagDetails {
    #[serde(default)]
    family: Option<String>,
}

impl From<TagEntry> for ModelInfo {
    fn from(entry: TagEntry) -> Self {
        let family = entry
            .details
            .and_then(|d| d.family)
            .or(entry.family)
            .filter(|f| !f.is_empty());
        Self {
            name: entry.name,
            size: entry.size,
            family,
        }
    }
}

impl OllamaGateway {
    /// Creates a gateway for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the HTTP client can't be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a gateway from an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NetworkError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(NetworkError::status(status.as_u16(), &body))
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, NetworkError> {
        let url = self.endpoint("tags");
        debug!(url = %url, "listing models");

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let tags: TagsResponse = response.json().await.map_err(NetworkError::malformed)?;

        Ok(tags.models.into_iter().map(ModelInfo::from).collect())
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, NetworkError> {
        let url = self.endpoint("generate");
        debug!(url = %url, model, prompt_chars = prompt.len(), "generate request");

        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        let response = Self::check_status(response).await?;
        let reply: GenerateResponse = response.json().await.map_err(NetworkError::malformed)?;

        Ok(reply.response)
    }
}
