//! Runtime configuration.
//!
//! Values come from command-line flags with environment fallbacks and are
//! validated once before any component is built.

use serde::Serialize;
use std::time::Duration;

use crate::chat::DEFAULT_REQUEST_TIMEOUT;
use crate::core::{ContextComposer, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_PREVIEW_CHARS};
use crate::document::Ingestor;
use crate::error::{Error, Result};
use crate::gateway::{DEFAULT_OLLAMA_URL, OllamaGateway};
use crate::io::{ChunkedReader, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE};

/// Validated settings for one docchat process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Base URL of the model server.
    pub ollama_url: String,
    /// Bound on each model request.
    pub request_timeout: Duration,
    /// Largest accepted document in bytes.
    pub max_file_size: u64,
    /// Bytes read per chunk.
    pub chunk_size: usize,
    /// Characters shown in a context preview.
    pub preview_chars: usize,
    /// Hard cap on the context length in characters.
    pub max_context_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

impl Config {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid setting.
    pub fn validate(self) -> Result<Self> {
        let url = self.ollama_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(config_error(format!(
                "model server URL must start with http:// or https://, got '{url}'"
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(config_error("request timeout must be at least 1 second"));
        }
        if self.max_file_size == 0 {
            return Err(config_error("maximum file size must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(config_error("chunk size must be greater than 0"));
        }
        if self.max_context_chars == 0 {
            return Err(config_error("context limit must be greater than 0"));
        }
        Ok(self)
    }

    /// Chunked reader honoring the size settings.
    #[must_use]
    pub const fn reader(&self) -> ChunkedReader {
        ChunkedReader::new(self.max_file_size).with_chunk_size(self.chunk_size)
    }

    /// Composer honoring the preview and cap settings.
    #[must_use]
    pub const fn composer(&self) -> ContextComposer {
        ContextComposer::new()
            .preview_chars(self.preview_chars)
            .max_chars(self.max_context_chars)
    }

    /// Ingestion pipeline built from these settings.
    #[must_use]
    pub const fn ingestor(&self) -> Ingestor {
        Ingestor::new(self.reader(), self.composer())
    }

    /// Ollama client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be built.
    pub fn gateway(&self) -> Result<OllamaGateway> {
        Ok(OllamaGateway::new(
            self.ollama_url.trim(),
            self.request_timeout,
        )?)
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}
