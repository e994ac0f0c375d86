//! CLI layer for docchat.
//!
//! Provides the command-line interface using clap, with commands for
//! listing models, extracting documents and chatting about them.

pub mod commands;
pub mod output;
pub mod parser;
pub mod repl;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
pub use repl::{ReplCommand, run_repl};
