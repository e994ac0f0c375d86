//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::Path;
use tokio::io::BufReader;
use tracing::warn;

use crate::chat::{ConversationController, Reply};
use crate::cli::output::{
    OutputFormat, format_extract, format_models, format_notice, format_reply,
};
use crate::cli::parser::{Cli, Commands};
use crate::cli::repl::{load_file, run_repl};
use crate::config::Config;
use crate::core::Progress;
use crate::error::{Result, SessionError};
use crate::gateway::ModelGateway;
use crate::io::FileSource;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = cli.config()?;

    match &cli.command {
        Commands::Models => cmd_models(&config, format).await,
        Commands::Extract { file, full } => cmd_extract(&config, file, *full, format).await,
        Commands::Ask {
            question,
            file,
            model,
        } => {
            let controller = ConversationController::new(config.gateway()?)
                .with_timeout(config.request_timeout);
            cmd_ask(
                &controller,
                &config,
                question,
                file.as_deref(),
                model.as_deref(),
                format,
            )
            .await
        }
        Commands::Chat { file, model } => {
            cmd_chat(&config, file.as_deref(), model.as_deref(), format).await
        }
    }
}

async fn cmd_models(config: &Config, format: OutputFormat) -> Result<String> {
    let models = config.gateway()?.list_models().await?;
    Ok(format_models(&models, None, format))
}

async fn cmd_extract(config: &Config, file: &Path, full: bool, format: OutputFormat) -> Result<String> {
    let mut source = FileSource::open(file).await?;
    let observer = |progress: Progress| tracing::debug!(progress = %progress, "ingestion progress");
    let report = config.ingestor().ingest(&mut source, &observer).await?;
    Ok(format_extract(&report, full, format))
}

/// Answers one question, optionally grounded in a document.
///
/// # Errors
///
/// Fails if the document can't be ingested, no model is available, or the
/// model request fails.
pub async fn cmd_ask<G: ModelGateway>(
    controller: &ConversationController<G>,
    config: &Config,
    question: &str,
    file: Option<&Path>,
    model: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    match controller.refresh_models().await {
        Ok(_) => {}
        Err(e) if model.is_some() => warn!(error = %e, "could not list models"),
        Err(e) => return Err(e.into()),
    }
    if let Some(model) = model {
        controller.select_model(model)?;
    }
    if controller.selected_model().is_none() {
        return Err(SessionError::NoModelSelected.into());
    }
    if let Some(file) = file {
        load_file(controller, &config.ingestor(), file).await?;
    }

    match controller.send(question).await? {
        reply @ Reply::Answer(_) => Ok(format_reply(&reply, format)),
        Reply::Recovered { error, .. } => Err(error.into()),
    }
}

async fn cmd_chat(
    config: &Config,
    file: Option<&Path>,
    model: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let controller =
        ConversationController::new(config.gateway()?).with_timeout(config.request_timeout);
    let ingestor = config.ingestor();
    let mut stdout = std::io::stdout();

    let mut banner = String::new();
    match controller.refresh_models().await {
        Ok(models) if models.is_empty() => banner.push_str(&format_notice(
            "No models found. Install one with `ollama pull <model>`.",
            format,
        )),
        Ok(_) => {}
        Err(e) => banner.push_str(&format_notice(
            &format!("Could not list models: {e}"),
            format,
        )),
    }
    if let Some(model) = model {
        controller.select_model(model)?;
    }
    if let Some(model) = controller.selected_model() {
        banner.push_str(&format_notice(&format!("Using model {model}."), format));
    }
    if let Some(file) = file {
        let report = load_file(&controller, &ingestor, file).await?;
        banner.push_str(&format_extract(&report, false, format));
    }
    if format == OutputFormat::Text {
        banner.push_str("Type /help for commands.\n");
    }
    std::io::Write::write_all(&mut stdout, banner.as_bytes())?;

    let stdin = BufReader::new(tokio::io::stdin());
    run_repl(&controller, &ingestor, stdin, &mut stdout, format).await?;
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, NetworkError};
    use crate::gateway::ModelInfo;
    use async_trait::async_trait;

    struct FixedGateway {
        models: Vec<ModelInfo>,
        answer: std::result::Result<String, NetworkError>,
    }

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn list_models(&self) -> std::result::Result<Vec<ModelInfo>, NetworkError> {
            Ok(self.models.clone())
        }

        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
        ) -> std::result::Result<String, NetworkError> {
            self.answer.clone()
        }
    }

    #[tokio::test]
    async fn test_ask_uses_first_model() {
        let controller = ConversationController::new(FixedGateway {
            models: vec![ModelInfo::named("llama3")],
            answer: Ok("42".to_string()),
        });
        let out = cmd_ask(
            &controller,
            &Config::default(),
            "meaning?",
            None,
            None,
            OutputFormat::Text,
        )
        .await
        .unwrap();
        assert_eq!(out, "42\n");
        assert_eq!(controller.selected_model().as_deref(), Some("llama3"));
    }

    #[tokio::test]
    async fn test_ask_without_models_fails() {
        let controller = ConversationController::new(FixedGateway {
            models: Vec::new(),
            answer: Ok(String::new()),
        });
        let err = cmd_ask(
            &controller,
            &Config::default(),
            "hello",
            None,
            None,
            OutputFormat::Text,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NoModelSelected)));
    }

    #[tokio::test]
    async fn test_ask_reports_gateway_failure() {
        let controller = ConversationController::new(FixedGateway {
            models: vec![ModelInfo::named("llama3")],
            answer: Err(NetworkError::new("model not found")),
        });
        let err = cmd_ask(
            &controller,
            &Config::default(),
            "hello",
            None,
            None,
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "network error: model not found");
        assert_eq!(controller.history().len(), 2);
    }
}
