//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::core::{DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_PREVIEW_CHARS};
use crate::error::Result;
use crate::gateway::DEFAULT_OLLAMA_URL;

/// docchat: chat with a local language model about a PDF document.
///
/// Extracts the text of a PDF and sends it as context alongside your
/// questions to an Ollama-compatible model server.
#[derive(Parser, Debug)]
#[command(name = "docchat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the model server.
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL, global = true)]
    pub ollama_url: String,

    /// Seconds to wait for a model reply.
    #[arg(long, env = "DOCCHAT_TIMEOUT", default_value = "120", global = true)]
    pub timeout: u64,

    /// Largest accepted document in bytes (default 200 MiB).
    #[arg(long, env = "DOCCHAT_MAX_FILE_SIZE", default_value = "209715200", global = true)]
    pub max_file_size: u64,

    /// Bytes read per chunk (default 1 MiB).
    #[arg(long, env = "DOCCHAT_CHUNK_SIZE", default_value = "1048576", global = true)]
    pub chunk_size: usize,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List models offered by the model server.
    Models,

    /// Extract the text of a PDF document.
    ///
    /// Prints page statistics and a preview of the extracted text.
    Extract {
        /// Path to the PDF file.
        file: PathBuf,

        /// Print the full text instead of a preview.
        #[arg(long)]
        full: bool,
    },

    /// Ask a single question, optionally about a document.
    Ask {
        /// The question to send.
        question: String,

        /// PDF file used as context.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Model to use (default: first model on the server).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat session on stdin.
    ///
    /// Lines starting with `/` are commands; type `/help` to list them.
    Chat {
        /// PDF file loaded before the first message.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Model to use (default: first model on the server).
        #[arg(short, long)]
        model: Option<String>,
    },
}

impl Cli {
    /// Builds the validated runtime configuration from the flags.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any flag is out of range.
    pub fn config(&self) -> Result<Config> {
        Config {
            ollama_url: self.ollama_url.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            max_file_size: self.max_file_size,
            chunk_size: self.chunk_size,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
        .validate()
    }
}
