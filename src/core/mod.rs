//! Core domain models for docchat.
//!
//! This module contains the fundamental data structures shared by the
//! ingestion pipeline and the conversation session: byte chunks, progress
//! reports, messages and the composed document context. These are pure
//! domain models with no I/O dependencies.

pub mod chunk;
pub mod context;
pub mod message;
pub mod progress;

pub use chunk::Chunk;
pub use context::{
    ContextComposer, ContextPreview, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_PREVIEW_CHARS,
    PAGE_SEPARATOR, SessionContext,
};
pub use message::{Message, Role};
pub use progress::{NoProgress, Progress, ProgressObserver, READ_PHASE_CEILING};
