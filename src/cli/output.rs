//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use serde::Serialize;
use std::fmt::Write;

use crate::chat::{Reply, SessionStatus};
use crate::core::{Message, SessionContext};
use crate::document::{IngestReport, PageOutcome};
use crate::error::Error;
use crate::gateway::ModelInfo;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats the model list.
#[must_use]
pub fn format_models(models: &[ModelInfo], selected: Option<&str>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_models_text(models, selected),
        OutputFormat::Json => format_json(&models),
    }
}

fn format_models_text(models: &[ModelInfo], selected: Option<&str>) -> String {
    if models.is_empty() {
        return "No models found. Install one with `ollama pull <model>`.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "  {:<32} {:<12} Family", "Name", "Size");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for model in models {
        let marker = if selected == Some(model.name.as_str()) {
            '*'
        } else {
            ' '
        };
        let size = model.size.map_or_else(|| "-".to_string(), format_size);
        let _ = writeln!(
            output,
            "{marker} {:<32} {:<12} {}",
            truncate(&model.name, 32),
            size,
            model.family.as_deref().unwrap_or("-")
        );
    }
    output
}

/// Formats the result of an ingestion run.
#[must_use]
pub fn format_extract(report: &IngestReport, full: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_extract_text(report, full),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ExtractOutput<'a> {
                name: &'a str,
                bytes: u64,
                pages: usize,
                failed_pages: Vec<u32>,
                chars: usize,
                truncated: bool,
                text: String,
            }
            let text = if full {
                report.context.text().to_string()
            } else {
                report.context.preview().to_string()
            };
            format_json(&ExtractOutput {
                name: &report.name,
                bytes: report.bytes,
                pages: report.page_count(),
                failed_pages: failed_pages(report),
                chars: report.context.char_count(),
                truncated: report.context.is_truncated(),
                text,
            })
        }
    }
}

fn failed_pages(report: &IngestReport) -> Vec<u32> {
    report
        .extraction
        .pages()
        .iter()
        .filter(|p| !p.is_extracted())
        .map(PageOutcome::page)
        .collect()
}

fn format_extract_text(report: &IngestReport, full: bool) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Document: {}", report.name);
    let _ = writeln!(output, "  Size:       {}", format_size(report.bytes));
    let _ = writeln!(output, "  Pages:      {}", report.page_count());
    let failed = failed_pages(report);
    if !failed.is_empty() {
        let list: Vec<String> = failed.iter().map(ToString::to_string).collect();
        let _ = writeln!(output, "  Unreadable: {}", list.join(", "));
    }
    let _ = writeln!(output, "  Characters: {}", report.context.char_count());
    if report.context.is_truncated() {
        output.push_str("  (context was cut at the size limit)\n");
    }
    output.push('\n');

    if full {
        output.push_str(report.context.text());
    } else {
        output.push_str("PDF content preview:\n");
        let _ = write!(output, "{}", report.context.preview());
    }
    output.push('\n');
    output
}

/// Formats a reply from the model.
#[must_use]
pub fn format_reply(reply: &Reply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{}\n", reply.message().content),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ReplyOutput<'a> {
                role: &'a str,
                content: &'a str,
                error: Option<String>,
            }
            let error = match reply {
                Reply::Answer(_) => None,
                Reply::Recovered { error, .. } => Some(error.to_string()),
            };
            format_json(&ReplyOutput {
                role: reply.message().role.as_str(),
                content: &reply.message().content,
                error,
            })
        }
    }
}

/// Formats the session status.
#[must_use]
pub fn format_status(status: &SessionStatus, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(status),
        OutputFormat::Json => format_json(status),
    }
}

fn format_status_text(status: &SessionStatus) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "  Model:     {}",
        status.model.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(output, "  Available: {} models", status.available_models);
    let _ = writeln!(output, "  Messages:  {}", status.messages);
    match (status.context_pages, status.context_chars) {
        (Some(pages), Some(chars)) => {
            let _ = writeln!(
                output,
                "  Context:   loaded and ready ({pages} pages, {chars} characters)"
            );
        }
        _ => output.push_str("  Context:   none\n"),
    }
    if let Some(ref failure) = status.last_failure {
        let _ = writeln!(output, "  Last error: {failure}");
    }
    output
}

/// Formats the message history.
#[must_use]
pub fn format_history(messages: &[Message], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if messages.is_empty() {
                return "No messages yet.\n".to_string();
            }
            let mut output = String::new();
            for message in messages {
                let _ = writeln!(output, "[{}] {}", message.role, message.content);
            }
            output
        }
        OutputFormat::Json => format_json(&messages),
    }
}

/// Formats the installed document context.
#[must_use]
pub fn format_context(context: Option<&SessionContext>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => context.map_or_else(
            || "No document loaded.\n".to_string(),
            |ctx| {
                format!(
                    "Context is loaded and ready ({} pages).\nPDF content preview:\n{}\n",
                    ctx.page_count(),
                    ctx.preview()
                )
            },
        ),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ContextOutput {
                loaded: bool,
                pages: Option<usize>,
                chars: Option<usize>,
                preview: Option<String>,
            }
            format_json(&ContextOutput {
                loaded: context.is_some(),
                pages: context.map(SessionContext::page_count),
                chars: context.map(SessionContext::char_count),
                preview: context.map(|c| c.preview().to_string()),
            })
        }
    }
}

/// Formats a short notice such as a confirmation.
#[must_use]
pub fn format_notice(message: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{message}\n"),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Notice<'a> {
                message: &'a str,
            }
            format_json(&Notice { message })
        }
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput<'a> {
                error: String,
                kind: &'a str,
            }
            format_json(&ErrorOutput {
                error: error.to_string(),
                kind: error_kind(error),
            })
        }
    }
}

const fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Validation(e) => e.reason(),
        Error::Io(_) => "io",
        Error::Document(_) => "document",
        Error::Network(_) => "network",
        Error::Session(_) => "session",
        Error::Command(_) => "command",
        Error::Config { .. } => "config",
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, ValidationError};

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("unknown"), OutputFormat::Text);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(100), "100 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
        assert_eq!(truncate("naïveté-model", 6), "naï...");
    }

    #[test]
    fn test_format_models_marks_selection() {
        let models = vec![
            ModelInfo {
                name: "llama3:8b".to_string(),
                size: Some(4 * 1024 * 1024 * 1024),
                family: Some("llama".to_string()),
            },
            ModelInfo::named("mistral"),
        ];
        let text = format_models(&models, Some("mistral"), OutputFormat::Text);
        assert!(text.contains("* mistral"));
        assert!(text.contains("4.0 GB"));

        let json = format_models(&models, None, OutputFormat::Json);
        assert!(json.contains("\"name\": \"llama3:8b\""));
    }

    #[test]
    fn test_format_models_empty() {
        assert!(format_models(&[], None, OutputFormat::Text).contains("No models found"));
    }

    #[test]
    fn test_format_reply_json_carries_error() {
        let error = NetworkError::new("connection refused");
        let reply = Reply::Recovered {
            message: Message::failure(&error),
            error,
        };
        let json = format_reply(&reply, OutputFormat::Json);
        assert!(json.contains("\"role\": \"assistant\""));
        assert!(json.contains("\"error\": \"connection refused\""));
    }

    #[test]
    fn test_format_context_without_document() {
        assert_eq!(
            format_context(None, OutputFormat::Text),
            "No document loaded.\n"
        );
        assert!(format_context(None, OutputFormat::Json).contains("\"loaded\": false"));
    }

    #[test]
    fn test_format_error_kinds() {
        let err: Error = ValidationError::WrongType {
            name: "a.txt".to_string(),
            detected: "text/plain".to_string(),
        }
        .into();
        assert!(format_error(&err, OutputFormat::Json).contains("\"kind\": \"wrong-type\""));
        assert!(format_error(&err, OutputFormat::Text).starts_with("validation error"));
    }
}
