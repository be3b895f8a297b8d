//! Command-line interface for lectograph
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turn recorded speech into a structured document
#[derive(Parser, Debug)]
#[command(
    name = "lectograph",
    version,
    about = "Turn recorded speech into a structured document"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input WAV file (reads stdin when omitted)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the document JSON here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Language code for transcription (e.g. zh, en, auto)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Skip the deep-analysis oracle; heuristic relations only
    #[arg(long)]
    pub no_oracle: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose log output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the active marker catalog
    Markers,

    /// Load and validate the configuration, then print the resolved values
    CheckConfig,
}
