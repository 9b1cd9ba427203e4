//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Agentless health monitor for a remote Linux host
#[derive(Parser)]
#[command(name = "qserver")]
#[command(author, version, about = "Monitor a remote Linux host over SSH")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    /// (default: ~/.config/qserver/config.toml)
    #[arg(short, long, global = true, env = "QSERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also set by a non-empty NO_COLOR)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll the host until interrupted
    #[command(about = "Poll the host on an interval until Ctrl+C")]
    Watch {
        /// Seconds between cycles (overrides the configuration file)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=3600))]
        interval: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "text", value_enum)]
        format: OutputFormat,

        /// Prompt for the SSH password instead of reading it from the
        /// configuration file
        #[arg(long)]
        ask_password: bool,
    },

    /// Run a single collection cycle
    #[command(about = "Collect one snapshot and exit (exit code 2 on failure)")]
    Probe {
        /// Output format
        #[arg(short, long, default_value = "text", value_enum)]
        format: OutputFormat,

        /// Prompt for the SSH password instead of reading it from the
        /// configuration file
        #[arg(long)]
        ask_password: bool,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// How outcomes are printed
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line per cycle
    Text,
    /// One JSON object per line
    Json,
}
