//! # docchat
//!
//! Chat with a local language model about a PDF document.
//!
//! docchat reads a PDF in bounded chunks, extracts its text page by page and
//! installs the result as context for a turn-based conversation with an
//! Ollama-compatible model server.
//!
//! ## Features
//!
//! - **Bounded ingestion**: size ceiling enforced before any byte is read
//! - **Partial-failure isolation**: an unreadable page becomes a placeholder
//! - **Progress reporting**: reading and extraction each cover half the range
//! - **Single-flight sessions**: one request in flight, failures shown inline

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chat;
pub mod cli;
pub mod config;
pub mod core;
pub mod document;
pub mod error;
pub mod gateway;
pub mod io;
pub mod logging;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use chat::{ConversationController, Reply, Session, SessionPhase};
pub use config::Config;
pub use core::{ContextComposer, Message, Progress, ProgressObserver, Role, SessionContext};
pub use document::{IngestReport, Ingestor};
pub use gateway::{ModelGateway, ModelInfo, OllamaGateway};
pub use io::{ByteSource, ChunkedReader, FileSource, MemorySource};

pub use cli::{Cli, Commands, OutputFormat};
