//! Interactive chat loop.
//!
//! Reads one line at a time. Lines starting with `/` are session commands;
//! anything else is sent to the model as a user message. Errors are shown
//! inline and never end the session.

use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::chat::ConversationController;
use crate::cli::output::{
    OutputFormat, format_context, format_error, format_extract, format_history, format_models,
    format_notice, format_reply, format_status,
};
use crate::core::Progress;
use crate::document::Ingestor;
use crate::error::{Error, Result};
use crate::gateway::ModelGateway;
use crate::io::FileSource;

/// Commands understood by the chat loop.
pub const HELP: &str = "\
Commands:
  /models        List models on the server
  /model NAME    Switch to model NAME
  /load PATH     Load a PDF document as context
  /unload        Remove the document context
  /context       Show the loaded document preview
  /history       Show the conversation so far
  /status        Show session status
  /help          Show this help
  /quit          Leave the chat
Any other line is sent to the model.
";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Blank line.
    Empty,
    /// Text for the model.
    Message(String),
    /// `/models`
    Models,
    /// `/model NAME`
    Model(String),
    /// `/load PATH`
    Load(PathBuf),
    /// `/unload`
    Unload,
    /// `/context`
    Context,
    /// `/history`
    History,
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// A slash command that is missing its argument or doesn't exist.
    Invalid(String),
}

impl ReplCommand {
    /// Parses a raw input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let message = line.trim_end_matches(['\r', '\n']);
        let line = message.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(message.to_string());
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(n, a)| (n, a.trim()));

        match (name, arg) {
            ("models", _) => Self::Models,
            ("model", "") => Self::Invalid("usage: /model NAME".to_string()),
            ("model", name) => Self::Model(name.to_string()),
            ("load", "") => Self::Invalid("usage: /load PATH".to_string()),
            ("load", path) => Self::Load(PathBuf::from(path)),
            ("unload", _) => Self::Unload,
            ("context", _) => Self::Context,
            ("history", _) => Self::History,
            ("status", _) => Self::Status,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            (other, _) => Self::Invalid(format!("unknown command: /{other} (type /help)")),
        }
    }
}

/// Loads a PDF from disk into the session.
///
/// # Errors
///
/// Returns any ingestion error; the previous context stays installed.
pub async fn load_file<G: ModelGateway>(
    controller: &ConversationController<G>,
    ingestor: &Ingestor,
    path: &std::path::Path,
) -> Result<crate::document::IngestReport> {
    let mut source = FileSource::open(path).await?;
    let observer = |progress: Progress| debug!(progress = %progress, "ingestion progress");
    controller
        .load_document(ingestor, &mut source, &observer)
        .await
}

/// Runs the chat loop until `/quit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub async fn run_repl<G, R, W>(
    controller: &ConversationController<G>,
    ingestor: &Ingestor,
    mut input: R,
    output: &mut W,
    format: OutputFormat,
) -> Result<()>
where
    G: ModelGateway,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut line = String::new();
    loop {
        if format == OutputFormat::Text {
            write!(output, "> ")?;
            output.flush()?;
        }

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }

        let rendered = match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Message(text) => match controller.send(&text).await {
                Ok(reply) => format_reply(&reply, format),
                Err(e) => render_error(&e.into(), format),
            },
            ReplCommand::Models => match controller.refresh_models().await {
                Ok(models) => {
                    format_models(&models, controller.selected_model().as_deref(), format)
                }
                Err(e) => render_error(&e.into(), format),
            },
            ReplCommand::Model(name) => match controller.select_model(&name) {
                Ok(()) => format_notice(&format!("Using model {name}."), format),
                Err(e) => render_error(&e.into(), format),
            },
            ReplCommand::Load(path) => match load_file(controller, ingestor, &path).await {
                Ok(report) => format_extract(&report, false, format),
                Err(e) => render_error(&e, format),
            },
            ReplCommand::Unload => match controller.clear_context() {
                Ok(()) => format_notice("Document removed.", format),
                Err(e) => render_error(&e.into(), format),
            },
            ReplCommand::Context => format_context(controller.context().as_ref(), format),
            ReplCommand::History => format_history(&controller.history(), format),
            ReplCommand::Status => format_status(&controller.status(), format),
            ReplCommand::Help => format_notice(HELP.trim_end(), format),
            ReplCommand::Invalid(message) => format_notice(&message, format),
        };
        output.write_all(rendered.as_bytes())?;
    }
    output.flush()?;
    Ok(())
}

fn render_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Error: {}\n", format_error(error, format)),
        OutputFormat::Json => format_error(error, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::gateway::ModelInfo;
    use async_trait::async_trait;
    use test_case::test_case;

    struct ScriptedGateway;

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn list_models(&self) -> std::result::Result<Vec<ModelInfo>, NetworkError> {
            Ok(vec![ModelInfo::named("llama3"), ModelInfo::named("mistral")])
        }

        async fn generate(
            &self,
            model: &str,
            prompt: &str,
        ) -> std::result::Result<String, NetworkError> {
            if prompt.contains("fail") {
                return Err(NetworkError::new("connection refused"));
            }
            Ok(format!("{model} says hi"))
        }
    }

    #[test_case("", ReplCommand::Empty ; "blank")]
    #[test_case("  hello there ", ReplCommand::Message("  hello there ".to_string()) ; "message keeps spacing")]
    #[test_case("  indented\r\n", ReplCommand::Message("  indented".to_string()) ; "message drops line ending")]
    #[test_case(" \r\n", ReplCommand::Empty ; "whitespace line")]
    #[test_case("/models", ReplCommand::Models ; "models")]
    #[test_case("/model llama3", ReplCommand::Model("llama3".to_string()) ; "model")]
    #[test_case("/load my paper.pdf", ReplCommand::Load(PathBuf::from("my paper.pdf")) ; "load with spaces")]
    #[test_case("/unload", ReplCommand::Unload ; "unload")]
    #[test_case("/exit", ReplCommand::Quit ; "exit")]
    #[test_case("/quit", ReplCommand::Quit ; "quit")]
    fn test_parse(line: &str, expected: ReplCommand) {
        assert_eq!(ReplCommand::parse(line), expected);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(ReplCommand::parse("/model"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/load  "), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/frobnicate"), ReplCommand::Invalid(_)));
    }

    async fn run(script: &str) -> String {
        let controller = ConversationController::new(ScriptedGateway);
        controller.refresh_models().await.unwrap();
        let mut output = Vec::new();
        run_repl(
            &controller,
            &Ingestor::default(),
            script.as_bytes(),
            &mut output,
            OutputFormat::Text,
        )
        .await
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_conversation_and_model_switch() {
        let output = run("hello\n/model mistral\nagain\n/history\n").await;
        assert!(output.contains("llama3 says hi"));
        assert!(output.contains("Using model mistral."));
        assert!(output.contains("mistral says hi"));
        assert!(output.contains("[user] again"));
    }

    #[tokio::test]
    async fn test_failure_is_shown_and_session_continues() {
        let output = run("please fail\n/status\n").await;
        assert!(output.contains("Error: connection refused. Please try again."));
        assert!(output.contains("Messages:  2"));
        assert!(output.contains("Last error: connection refused"));
    }

    #[tokio::test]
    async fn test_quit_stops_reading() {
        let output = run("/quit\nnever sent\n").await;
        assert!(!output.contains("says hi"));
    }

    #[tokio::test]
    async fn test_errors_do_not_end_session() {
        let output = run("/model nope\n/load /definitely/missing.pdf\n/context\n").await;
        assert!(output.contains("unknown model: nope"));
        assert!(output.contains("file not found"));
        assert!(output.contains("No document loaded."));
    }
}
