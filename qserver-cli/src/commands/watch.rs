//! Continuous polling command.

use std::io::Write;
use std::sync::Arc;

use qserver_core::{Scheduler, SessionCollector, SshTransport};

use super::GlobalOptions;
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::OutcomeFormatter;
use crate::util::{build_runtime, connection_config, init_logging, load_config};

/// Watch command handler
///
/// Runs until Ctrl+C. Failed cycles are printed and polling continues.
pub fn cmd_watch(
    opts: &GlobalOptions<'_>,
    interval: Option<u32>,
    format: OutputFormat,
    ask_password: bool,
) -> Result<(), CliError> {
    let mut config = load_config(opts.config)?;
    if let Some(secs) = interval {
        config.monitoring.interval_secs = secs;
    }
    init_logging(&config, opts)?;
    let connection = connection_config(&config, ask_password)?;
    let settings = config.monitoring;
    let formatter = OutcomeFormatter::new(format, opts.color());

    if !opts.quiet {
        eprintln!(
            "Watching {} every {}s (Ctrl+C to stop)",
            connection.destination(),
            settings.effective_interval_secs()
        );
    }

    // Probes for sshpass with a blocking spawn
    let transport = SshTransport::new(settings.connect_timeout().as_secs());

    let runtime = build_runtime()?;
    let stats = runtime.block_on(async move {
        let collector = SessionCollector::with_settings(transport, connection, &settings)
            .map_err(|e| CliError::Config(e.to_string()))?;

        let handle = Scheduler::new(Arc::new(collector), settings.interval()).start(
            move |outcome| {
                // A closed stdout (e.g. `| head`) must not panic the delivery task
                let _ = writeln!(std::io::stdout().lock(), "{}", formatter.render(&outcome));
            },
        );

        let signal = tokio::signal::ctrl_c().await;
        let stats = handle.stop().await;
        signal?;
        Ok::<_, CliError>(stats)
    })?;

    if !opts.quiet {
        eprintln!(
            "\nStopped after {} cycles ({} delivered, {} ticks skipped)",
            stats.cycles_started, stats.outcomes_delivered, stats.ticks_skipped
        );
    }
    Ok(())
}
