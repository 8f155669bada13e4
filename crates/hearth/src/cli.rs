//! Clap derive structures for the `hearth` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hearth -- appliance cloud to message bus bridge
#[derive(Debug, Parser)]
#[command(
    name = "hearth",
    version,
    about = "Bridge appliance-cloud state onto a home-automation message bus",
    long_about = "Polls the appliance cloud on a fixed interval and publishes each\n\
        appliance's state, an aggregate summary, and hub discovery documents.\n\n\
        Bus messages are written to stdout as JSON lines\n\
        ({\"topic\",\"retain\",\"payload\"}); logs go to stderr.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge until interrupted
    Run,

    /// Run a single poll cycle and print its report
    Once,

    /// Show the persisted session without contacting the cloud
    Status,

    /// Print the effective configuration with secrets redacted
    Config,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
