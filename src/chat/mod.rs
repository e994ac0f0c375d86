//! Conversation session for docchat.
//!
//! The [`ConversationController`] exclusively owns the [`Session`]: message
//! history, selected model, document context and the in-flight flag. It
//! enforces single-flight sending and turns gateway failures into visible
//! assistant turns.

pub mod controller;
pub mod session;

pub use controller::{
    ConversationController, DEFAULT_REQUEST_TIMEOUT, IngestTicket, Reply, compose_prompt,
};
pub use session::{Session, SessionPhase, SessionStatus};
