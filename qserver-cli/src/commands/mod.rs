//! Command handler modules for the CLI.

mod completions;
mod probe;
mod watch;

use std::io::IsTerminal;
use std::path::Path;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

/// Flags shared by every command
#[derive(Debug, Clone, Copy)]
pub struct GlobalOptions<'a> {
    pub config: Option<&'a Path>,
    pub verbose: u8,
    pub quiet: bool,
    pub no_color: bool,
}

impl GlobalOptions<'_> {
    /// Whether stdout output should be coloured
    pub fn color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let opts = GlobalOptions {
        config: cli.config.as_deref(),
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    match cli.command {
        Commands::Watch {
            interval,
            format,
            ask_password,
        } => watch::cmd_watch(&opts, interval, format, ask_password),
        Commands::Probe {
            format,
            ask_password,
        } => probe::cmd_probe(&opts, format, ask_password),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
