//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sqlmatic-agent", version, about = "NL-to-SQL agent over a configured database")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, default_value = "sqlmatic.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask questions interactively (or answer one question and exit).
    Repl {
        /// One-shot question; omit to read questions from stdin.
        #[arg(long)]
        query: Option<String>,
        /// Conversation thread to use.
        #[arg(long, default_value = "default")]
        thread_id: String,
    },
    /// Run the offline evaluation harness over the ground truth file.
    Eval {
        /// Evaluate only the first N cases.
        #[arg(long)]
        limit: Option<usize>,
        /// Emit the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Print the database schema description and exit.
    Schema {
        /// Emit compact JSON on one line.
        #[arg(long)]
        compact: bool,
    },
}
