//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// How entries are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Numbered list for humans.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Override the number of entries shown
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Override the refresh interval in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub interval: Option<u64>,
}

/// Fetch command arguments.
#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Override the number of entries kept
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum number of entries to show (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip the confirmation requirement
    #[arg(short, long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration management commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file (uses default if not specified)
        file: Option<PathBuf>,
    },
}
