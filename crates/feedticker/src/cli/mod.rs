//! Command-line interface for feedticker.
//!
//! This module provides the CLI structure for the `feedticker` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClearCommand, ConfigCommand, FetchCommand, OutputFormat, RunCommand, ShowCommand,
    StatusCommand,
};

use crate::logging::Verbosity;

/// feedticker - Keep the latest headlines of an RSS feed on screen
///
/// Polls a feed on a fixed interval, caches the newest entries locally and
/// keeps showing the cached entries whenever the feed cannot be reached.
#[derive(Debug, Parser)]
#[command(name = "feedticker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the feed and keep the display current until interrupted
    Run(RunCommand),

    /// Refresh once and print the result
    Fetch(FetchCommand),

    /// Print the cached entries without touching the network
    Show(ShowCommand),

    /// Remove all cached entries
    Clear(ClearCommand),

    /// Show cache status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
