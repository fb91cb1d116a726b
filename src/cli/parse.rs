//! CLI parse: clap types for graphql-typegen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// graphql-typegen - TypeScript definitions for embedded GraphQL queries
#[derive(Parser, Debug)]
#[command(name = "graphql-typegen")]
#[command(about = "Generate TypeScript types for GraphQL queries and keep them up to date")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (replaces typegen.toml lookup)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate every artifact once
    Generate,
    /// Generate, then regenerate whenever documents or the schema change
    Watch {
        /// Quiescence window in milliseconds (overrides codegen_delay)
        #[arg(long)]
        delay: Option<u64>,
        /// Stop on the first failed run (overrides fail_on_error)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        fail_on_error: Option<bool>,
    },
    /// Print the effective configuration as TOML
    Config,
}
