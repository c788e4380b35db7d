//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stackscout_core::types::Source;

/// StackScout -- package metadata collection.
///
/// Use `stackscout <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "stackscout", version, about, long_about = None)]
pub struct Cli {
    /// Path to the stackscout.toml configuration file.
    #[arg(short, long, default_value = "stackscout.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect a single package or image and print its catalog entry.
    Collect(CollectArgs),

    /// Run a scan job over a list of names and wait for it to finish.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- collect ----

/// Collect one item immediately, bypassing the work queue.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Source registry (pypi, npm, dockerhub).
    pub source: Source,

    /// Package or image name (e.g. `requests`, `bitnami/redis`).
    pub name: String,
}

// ---- scan ----

/// Run a scan job with the configured worker pool.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Source registry (pypi, npm, dockerhub).
    pub source: Source,

    /// Names to collect.
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,

    /// Give up waiting for the job after this many seconds.
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
}

// ---- config ----

/// Manage stackscout configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, collector, sources, license, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
