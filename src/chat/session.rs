//! Session state owned by the conversation controller.

use serde::Serialize;

use crate::core::{Message, SessionContext};
use crate::error::NetworkError;
use crate::gateway::ModelInfo;

/// Request state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Ready to send.
    #[default]
    Idle,
    /// A request is in flight.
    Sending,
}

/// The single in-memory conversation state.
///
/// History is append-only. The context is replaced wholesale, never
/// patched.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) messages: Vec<Message>,
    pub(crate) model: Option<String>,
    pub(crate) models: Vec<ModelInfo>,
    pub(crate) context: Option<SessionContext>,
    pub(crate) phase: SessionPhase,
    pub(crate) epoch: u64,
    pub(crate) last_failure: Option<NetworkError>,
}

impl Session {
    /// Creates an idle session with no history, model or context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Currently selected model.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Models last reported by the gateway.
    #[must_use]
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Installed document context.
    #[must_use]
    pub const fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Current request state.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Most recent gateway failure, cleared by the next successful reply.
    #[must_use]
    pub const fn last_failure(&self) -> Option<&NetworkError> {
        self.last_failure.as_ref()
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Summary of the session for display.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            model: self.model.clone(),
            available_models: self.models.len(),
            messages: self.messages.len(),
            context_loaded: self.context.is_some(),
            context_chars: self.context.as_ref().map(SessionContext::char_count),
            context_pages: self.context.as_ref().map(SessionContext::page_count),
            last_failure: self.last_failure.as_ref().map(ToString::to_string),
        }
    }
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Request state.
    pub phase: SessionPhase,
    /// Selected model.
    pub model: Option<String>,
    /// Number of models offered by the gateway.
    pub available_models: usize,
    /// Number of messages in history.
    pub messages: usize,
    /// Whether a document context is installed.
    pub context_loaded: bool,
    /// Context length in characters.
    pub context_chars: Option<usize>,
    /// Pages the context was composed from.
    pub context_pages: Option<usize>,
    /// Most recent gateway failure.
    pub last_failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = Session::new();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.messages().is_empty());
        assert!(session.model().is_none());
        assert!(session.context().is_none());
        assert!(session.last_failure().is_none());
    }

    #[test]
    fn test_status_reflects_history() {
        let mut session = Session::new();
        session.append(Message::user("hi"));
        session.append(Message::assistant("hello"));
        let status = session.status();
        assert_eq!(status.messages, 2);
        assert!(!status.context_loaded);
        assert_eq!(status.context_chars, None);
    }
}
