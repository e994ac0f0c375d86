//! Conversation controller.
//!
//! Owns the session and mediates every change to it. Sending is
//! single-flight: while a request is in flight, further sends, model
//! changes and context changes are rejected with
//! [`SessionError::AlreadyInFlight`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::session::{Session, SessionPhase, SessionStatus};
use crate::core::{Message, ProgressObserver, SessionContext};
use crate::document::{IngestReport, Ingestor};
use crate::error::{NetworkError, SessionError};
use crate::gateway::{ModelGateway, ModelInfo};
use crate::io::ByteSource;

/// Default bound on a single gateway call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the prompt sent to the model.
///
/// With a non-empty context the question is prefixed by the document text;
/// otherwise the question is sent alone.
///
/// # Examples
///
/// ```
/// use docchat::chat::compose_prompt;
/// use docchat::core::ContextComposer;
///
/// let ctx = ContextComposer::new().compose(["ctx"]).unwrap();
/// assert_eq!(
///     compose_prompt(Some(&ctx), "What is X?"),
///     "Context from document:\nctx\n\nUser question: What is X?"
/// );
/// assert_eq!(compose_prompt(None, "hi"), "hi");
/// ```
#[must_use]
pub fn compose_prompt(context: Option<&SessionContext>, question: &str) -> String {
    match context.map(SessionContext::text).filter(|t| !t.is_empty()) {
        Some(text) => format!("Context from document:\n{text}\n\nUser question: {question}"),
        None => question.to_string(),
    }
}

/// Outcome of a completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The model answered.
    Answer(Message),
    /// The gateway failed; the failure was appended as an assistant turn.
    Recovered {
        /// The appended error turn.
        message: Message,
        /// The underlying failure.
        error: NetworkError,
    },
}

impl Reply {
    /// The assistant message appended to history.
    #[must_use]
    pub const fn message(&self) -> &Message {
        match self {
            Self::Answer(message) | Self::Recovered { message, .. } => message,
        }
    }

    /// True if the reply stands in for a failed request.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Proof that an ingestion run was started at a given epoch.
///
/// Only the most recent ticket can install a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestTicket {
    epoch: u64,
}

impl IngestTicket {
    /// Epoch captured when the run started.
    #[must_use]
    pub const fn epoch(self) -> u64 {
        self.epoch
    }
}

/// Drives one conversation session against a [`ModelGateway`].
///
/// The session lives behind a mutex that is never held across an await,
/// so the controller can be shared by reference between tasks.
pub struct ConversationController<G> {
    gateway: G,
    session: Mutex<Session>,
    request_timeout: Duration,
}

impl<G: ModelGateway> ConversationController<G> {
    /// Creates a controller with an idle, empty session.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            session: Mutex::new(Session::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the bound on each gateway call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The gateway used for requests.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_idle(session: &Session) -> Result<(), SessionError> {
        if session.phase == SessionPhase::Sending {
            return Err(SessionError::AlreadyInFlight);
        }
        Ok(())
    }

    /// Copy of the message history.
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Currently selected model.
    #[must_use]
    pub fn selected_model(&self) -> Option<String> {
        self.lock().model.clone()
    }

    /// Models last reported by the gateway.
    #[must_use]
    pub fn available_models(&self) -> Vec<ModelInfo> {
        self.lock().models.clone()
    }

    /// Copy of the installed context.
    #[must_use]
    pub fn context(&self) -> Option<SessionContext> {
        self.lock().context.clone()
    }

    /// Current request state.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    /// Most recent gateway failure.
    #[must_use]
    pub fn last_failure(&self) -> Option<NetworkError> {
        self.lock().last_failure.clone()
    }

    /// Snapshot of the session for display.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    /// Fetches the model list and auto-selects the first model if none is
    /// selected and the session is idle.
    ///
    /// # Errors
    ///
    /// Returns the gateway's [`NetworkError`]; the session is unchanged.
    pub async fn refresh_models(&self) -> Result<Vec<ModelInfo>, NetworkError> {
        let models = self.gateway.list_models().await?;

        let mut session = self.lock();
        session.models.clone_from(&models);
        if session.model.is_none()
            && session.phase == SessionPhase::Idle
            && let Some(first) = models.first()
        {
            info!(model = %first.name, "auto-selected model");
            session.model = Some(first.name.clone());
        }
        if models.is_empty() {
            warn!("model server reports no installed models");
        }
        Ok(models)
    }

    /// Selects the model used for subsequent sends.
    ///
    /// When the gateway has reported a model list, the name must be in it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyInFlight`] while sending and
    /// [`SessionError::UnknownModel`] for names the gateway doesn't offer.
    pub fn select_model(&self, name: &str) -> Result<(), SessionError> {
        let mut session = self.lock();
        Self::ensure_idle(&session)?;
        if !session.models.is_empty() && !session.models.iter().any(|m| m.name == name) {
            return Err(SessionError::UnknownModel {
                name: name.to_string(),
            });
        }
        info!(model = name, "selected model");
        session.model = Some(name.to_string());
        Ok(())
    }

    /// Starts an ingestion run, superseding any run still in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyInFlight`] while sending.
    pub fn begin_ingestion(&self) -> Result<IngestTicket, SessionError> {
        let mut session = self.lock();
        Self::ensure_idle(&session)?;
        session.epoch += 1;
        debug!(epoch = session.epoch, "ingestion started");
        Ok(IngestTicket {
            epoch: session.epoch,
        })
    }

    /// Installs the context produced by the run that holds `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Superseded`] if a newer run started or the
    /// document was removed since, and [`SessionError::AlreadyInFlight`]
    /// while sending.
    pub fn install_context(
        &self,
        ticket: IngestTicket,
        context: SessionContext,
    ) -> Result<(), SessionError> {
        let mut session = self.lock();
        if ticket.epoch != session.epoch {
            debug!(
                stale = ticket.epoch,
                current = session.epoch,
                "discarding superseded ingestion"
            );
            return Err(SessionError::Superseded {
                epoch: ticket.epoch,
            });
        }
        Self::ensure_idle(&session)?;
        session.context = Some(context);
        Ok(())
    }

    /// Removes the document context and supersedes any running ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyInFlight`] while sending.
    pub fn clear_context(&self) -> Result<(), SessionError> {
        let mut session = self.lock();
        Self::ensure_idle(&session)?;
        session.epoch += 1;
        session.context = None;
        debug!("document context cleared");
        Ok(())
    }

    /// Ingests `source` and installs the result as the session context.
    ///
    /// On failure the previous context stays installed.
    ///
    /// # Errors
    ///
    /// Returns ingestion errors, [`SessionError::Superseded`] if another
    /// document replaced this one meanwhile, or
    /// [`SessionError::AlreadyInFlight`] while sending.
    pub async fn load_document(
        &self,
        ingestor: &Ingestor,
        source: &mut dyn ByteSource,
        observer: &dyn ProgressObserver,
    ) -> crate::Result<IngestReport> {
        let ticket = self.begin_ingestion()?;
        let report = ingestor.ingest(source, observer).await?;
        self.install_context(ticket, report.context.clone())?;
        Ok(report)
    }

    /// Sends a user turn and waits for the model's reply.
    ///
    /// The user message is appended before the gateway is called. A gateway
    /// failure or timeout is appended as an assistant error turn and
    /// returned as [`Reply::Recovered`]; the session stays usable.
    ///
    /// # Errors
    ///
    /// Rejects without touching history: [`SessionError::AlreadyInFlight`]
    /// while another send is pending, [`SessionError::NoModelSelected`]
    /// without a model and [`SessionError::EmptyMessage`] for blank text.
    pub async fn send(&self, text: &str) -> Result<Reply, SessionError> {
        let (model, prompt) = {
            let mut session = self.lock();
            Self::ensure_idle(&session)?;
            let model = session.model.clone().ok_or(SessionError::NoModelSelected)?;
            if text.trim().is_empty() {
                return Err(SessionError::EmptyMessage);
            }

            session.phase = SessionPhase::Sending;
            session.append(Message::user(text));
            let prompt = compose_prompt(session.context.as_ref(), text);
            (model, prompt)
        };
        let _in_flight = InFlight {
            session: &self.session,
        };

        debug!(model = %model, prompt_chars = prompt.len(), "sending message");
        let outcome =
            match tokio::time::timeout(self.request_timeout, self.gateway.generate(&model, &prompt))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(NetworkError::timeout(self.request_timeout)),
            };

        let reply = {
            let mut session = self.lock();
            let reply = match outcome {
                Ok(answer) => {
                    session.last_failure = None;
                    Reply::Answer(Message::assistant(answer))
                }
                Err(error) => {
                    warn!(model = %model, error = %error, "model request failed");
                    session.last_failure = Some(error.clone());
                    Reply::Recovered {
                        message: Message::failure(&error),
                        error,
                    }
                }
            };
            session.append(reply.message().clone());
            session.phase = SessionPhase::Idle;
            reply
        };

        Ok(reply)
    }
}

/// Returns the session to idle if a send is abandoned mid-flight.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.phase == SessionPhase::Sending {
            warn!("send abandoned before a reply arrived");
            session.phase = SessionPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContextComposer;
    use async_trait::async_trait;

    struct EchoGateway;

    #[async_trait]
    impl ModelGateway for EchoGateway {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, NetworkError> {
            Ok(vec![ModelInfo::named("echo"), ModelInfo::named("other")])
        }

        async fn generate(&self, _model: &str, prompt: &str) -> Result<String, NetworkError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    struct SlowGateway;

    #[async_trait]
    impl ModelGateway for SlowGateway {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, NetworkError> {
            Ok(Vec::new())
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, NetworkError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn context(text: &str) -> SessionContext {
        ContextComposer::new().compose([text]).unwrap()
    }

    #[test]
    fn test_compose_prompt_ignores_missing_context() {
        assert_eq!(compose_prompt(None, "q"), "q");
        assert_eq!(
            compose_prompt(Some(&context("doc")), "q"),
            "Context from document:\ndoc\n\nUser question: q"
        );
    }

    #[tokio::test]
    async fn test_refresh_auto_selects_first_model() {
        let controller = ConversationController::new(EchoGateway);
        let models = controller.refresh_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(controller.selected_model().as_deref(), Some("echo"));

        controller.select_model("other").unwrap();
        controller.refresh_models().await.unwrap();
        assert_eq!(controller.selected_model().as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_select_unknown_model_rejected_once_list_known() {
        let controller = ConversationController::new(EchoGateway);
        controller.select_model("anything").unwrap();
        controller.refresh_models().await.unwrap();
        assert_eq!(
            controller.select_model("missing"),
            Err(SessionError::UnknownModel {
                name: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let controller = ConversationController::new(EchoGateway);
        controller.select_model("echo").unwrap();
        assert_eq!(
            controller.send("   ").await,
            Err(SessionError::EmptyMessage)
        );
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_context_sends_question_only() {
        let controller = ConversationController::new(EchoGateway);
        controller.select_model("echo").unwrap();
        let reply = controller.send("hello").await.unwrap();
        assert_eq!(reply.message().content, "echo: hello");
        assert!(!reply.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_error_turn() {
        let controller =
            ConversationController::new(SlowGateway).with_timeout(Duration::from_secs(5));
        controller.select_model("slow").unwrap();

        let reply = controller.send("anyone?").await.unwrap();
        assert!(reply.is_error());
        assert_eq!(
            reply.message().content,
            "Error: model server did not respond within 5 seconds. Please try again."
        );
        assert_eq!(controller.phase(), SessionPhase::Idle);
        assert!(controller.last_failure().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_returns_to_idle() {
        let controller = ConversationController::new(SlowGateway);
        controller.select_model("slow").unwrap();

        let pending = controller.send("abandon me");
        let _ = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert_eq!(controller.phase(), SessionPhase::Idle);
        assert_eq!(controller.history(), vec![Message::user("abandon me")]);
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let controller = ConversationController::new(EchoGateway);
        let first = controller.begin_ingestion().unwrap();
        let second = controller.begin_ingestion().unwrap();

        assert_eq!(
            controller.install_context(first, context("old")),
            Err(SessionError::Superseded {
                epoch: first.epoch()
            })
        );
        controller.install_context(second, context("new")).unwrap();
        assert_eq!(controller.context().unwrap().text(), "new");
    }

    #[tokio::test]
    async fn test_clear_context_supersedes_running_ingestion() {
        let controller = ConversationController::new(EchoGateway);
        let ticket = controller.begin_ingestion().unwrap();
        controller.clear_context().unwrap();
        assert!(controller.install_context(ticket, context("late")).is_err());
        assert!(controller.context().is_none());
    }
}
