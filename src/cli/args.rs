//! Command-line argument parsing for SlideScout
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SlideScout - Find and rerank the slides that answer a question
#[derive(Parser, Debug)]
#[command(name = "slidescout")]
#[command(version)]
#[command(about = "Two-stage slide retrieval: vector search plus cross-encoder reranking", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve and rerank slides for a query
    Query {
        /// Query text
        #[arg(value_name = "QUERY")]
        text: String,

        /// Candidates fetched from the index (overrides config)
        #[arg(long)]
        initial_k: Option<usize>,

        /// Results kept after reranking (overrides config)
        #[arg(long)]
        final_n: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Show the ranking before and after reranking
        #[arg(long)]
        compare: bool,

        /// Print the context the agent tool would receive
        #[arg(long, conflicts_with_all = ["json", "compare"])]
        context: bool,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "slidescout=info",
            Verbosity::VeryVerbose => "slidescout=debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
