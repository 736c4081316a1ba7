//! CLI layer for docqa.
//!
//! Provides the command-line interface using clap, with commands for
//! asking questions, previewing the chunk plan, and writing prompt
//! templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
