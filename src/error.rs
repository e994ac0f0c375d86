//! Error types for docchat operations.
//!
//! This module provides the error hierarchy using `thiserror` for document
//! ingestion, the model gateway, the conversation session and CLI commands.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for docchat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any byte was read.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors while reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Structural or extraction errors for the document.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Model gateway errors.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Session state errors.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Rejections of a document at the input boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Declared size exceeds the configured ceiling.
    #[error("file is too large: {size} bytes (max: {max} bytes)")]
    TooLarge {
        /// Declared size of the source.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Declared type is not a PDF document.
    #[error("unsupported file type for {name}: {detected} (expected application/pdf)")]
    WrongType {
        /// Name of the rejected source.
        name: String,
        /// MIME type or extension that was found.
        detected: String,
    },
}

impl ValidationError {
    /// Short machine-readable reason, suitable for user feedback.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "too-large",
            Self::WrongType { .. } => "wrong-type",
        }
    }
}

/// I/O-specific errors while reading a byte source.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read from the source.
    #[error("failed to read {path}: {reason}")]
    ReadFailed {
        /// Name or path of the source.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// A chunk came back shorter than requested.
    #[error("short read at byte offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Offset of the chunk.
        offset: u64,
        /// Requested length.
        expected: usize,
        /// Length actually returned.
        actual: usize,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Errors raised while parsing or extracting a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Signature or structure check failed.
    #[error("malformed document: {reason}")]
    Malformed {
        /// What the parser rejected.
        reason: String,
    },

    /// The document parsed but declares no pages.
    #[error("the document appears to be empty (no pages)")]
    NoPages,

    /// A page number outside `1..=page_count` was requested.
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested page.
        page: u32,
        /// Number of pages in the document.
        count: u32,
    },

    /// Text extraction failed for a single page.
    #[error("failed to extract text from page {page}: {reason}")]
    PageFailed {
        /// Page number (1-based).
        page: u32,
        /// Reason for failure.
        reason: String,
    },

    /// Every page extracted to empty text.
    #[error("no readable text found in the document")]
    EmptyExtraction,
}

/// Failure talking to the model-serving endpoint.
///
/// Connection failures, non-success statuses, malformed bodies and timeouts
/// all collapse into this one type with a human-readable cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct NetworkError {
    /// Human-readable cause.
    pub cause: String,
}

impl NetworkError {
    /// Creates an error from any displayable cause.
    #[must_use]
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    /// The endpoint answered with a non-success status.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            Self::new(format!("model server returned HTTP {status}"))
        } else {
            Self::new(format!("model server returned HTTP {status}: {body}"))
        }
    }

    /// The response body could not be understood.
    #[must_use]
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::new(format!("malformed response from model server: {reason}"))
    }

    /// The request did not complete in time.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(format!(
            "model server did not respond within {} seconds",
            after.as_secs()
        ))
    }
}

/// Session state errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A request is already in flight for this session.
    #[error("a request is already in flight")]
    AlreadyInFlight,

    /// No model has been selected.
    #[error("no model selected")]
    NoModelSelected,

    /// The user message was blank.
    #[error("message is empty")]
    EmptyMessage,

    /// The requested model is not offered by the gateway.
    #[error("unknown model: {name}")]
    UnknownModel {
        /// Requested model name.
        name: String,
    },

    /// A newer ingestion or a document removal superseded this one.
    #[error("ingestion {epoch} was superseded by a newer document")]
    Superseded {
        /// Epoch carried by the stale ticket.
        epoch: u64,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

// Implement From traits for external errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::new(format!(
                "could not connect to the model server ({err}); please ensure it is running"
            ))
        } else if err.is_timeout() {
            Self::new(format!("request to the model server timed out ({err})"))
        } else if err.is_decode() {
            Self::malformed(err)
        } else {
            Self::new(format!("request to the model server failed: {err}"))
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::OutputFormat(err.to_string())
    }
}
