//! `QServer` CLI - watch the health of a remote Linux host
//!
//! Reads connection settings from a TOML file, then either polls the host
//! on an interval (`watch`) or collects a single snapshot (`probe`).

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    if let Err(e) = commands::dispatch(cli) {
        if !quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
