//! Single-shot collection command.

use std::io::Write;

use qserver_core::{SessionCollector, SshTransport};

use super::GlobalOptions;
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::OutcomeFormatter;
use crate::util::{build_runtime, connection_config, init_logging, load_config};

/// Probe command handler
pub fn cmd_probe(
    opts: &GlobalOptions<'_>,
    format: OutputFormat,
    ask_password: bool,
) -> Result<(), CliError> {
    let config = load_config(opts.config)?;
    init_logging(&config, opts)?;
    let connection = connection_config(&config, ask_password)?;
    let settings = config.monitoring;

    // Probes for sshpass with a blocking spawn
    let transport = SshTransport::new(settings.connect_timeout().as_secs());

    let runtime = build_runtime()?;
    let outcome = runtime.block_on(async {
        let collector = SessionCollector::with_settings(transport, connection, &settings)
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok::<_, CliError>(collector.collect_once().await)
    })?;

    let rendered = OutcomeFormatter::new(format, opts.color()).render(&outcome);
    match outcome {
        Ok(_) => {
            writeln!(std::io::stdout().lock(), "{rendered}")?;
            Ok(())
        }
        Err(failure) => {
            // JSON consumers get the failure on stdout as well
            if format == OutputFormat::Json {
                writeln!(std::io::stdout().lock(), "{rendered}")?;
            }
            Err(CliError::Collection(failure))
        }
    }
}
