//! Model gateway contract.
//!
//! The gateway is the stateless request/response boundary to the inference
//! backend. Every failure is normalized to a single [`NetworkError`].

pub mod ollama;

pub use ollama::{DEFAULT_OLLAMA_URL, OllamaGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// A model offered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier passed to `generate`.
    pub name: String,
    /// Size on disk in bytes, when reported.
    pub size: Option<u64>,
    /// Model family, when reported.
    pub family: Option<String>,
}

impl ModelInfo {
    /// Creates a model entry with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            family: None,
        }
    }
}

/// Request/response boundary to a language-model backend.
///
/// Implementations must be thread-safe (`Send + Sync`); the conversation
/// controller shares one gateway for the session lifetime.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Lists the models the backend can serve.
    ///
    /// An empty list is a valid answer meaning no models are installed.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the backend can't be reached or answers
    /// with something unusable.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, NetworkError>;

    /// Generates a single, non-streamed completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] on connection failure, non-success status or
    /// a malformed body.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, NetworkError>;
}

#[async_trait]
impl<G: ModelGateway + ?Sized> ModelGateway for std::sync::Arc<G> {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, NetworkError> {
        (**self).list_models().await
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, NetworkError> {
        (**self).generate(model, prompt).await
    }
}
