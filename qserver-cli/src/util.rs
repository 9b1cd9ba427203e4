//! Shared utility functions used across command modules.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use qserver_core::{
    AppConfig, ConnectionConfig, TracingConfig, TracingLevel, TracingOutput, init_tracing,
};
use secrecy::SecretString;

use crate::commands::GlobalOptions;
use crate::error::CliError;

/// Loads the configuration from `config_path` or the default location.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, CliError> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::default_path()?,
    };

    if !path.exists() {
        return Err(CliError::Config(format!(
            "{} not found (create it or pass --config)",
            path.display()
        )));
    }

    Ok(AppConfig::load(&path)?)
}

/// Sets up logging from the `[logging]` table and the verbosity flags.
///
/// A set `RUST_LOG` replaces the computed filter.
pub fn init_logging(config: &AppConfig, opts: &GlobalOptions<'_>) -> Result<(), CliError> {
    let level = if opts.quiet {
        TracingLevel::Error
    } else {
        config.logging.level.raised_by(opts.verbose)
    };

    let mut tracing_config = TracingConfig::new()
        .with_level(level)
        .with_ansi(!opts.no_color && std::io::stderr().is_terminal());

    if let Some(path) = &config.logging.file {
        tracing_config = tracing_config.with_output(TracingOutput::File { path: path.clone() });
    }
    if let Ok(filter) = std::env::var("RUST_LOG")
        && !filter.trim().is_empty()
    {
        tracing_config = tracing_config.with_filter(filter);
    }

    init_tracing(&tracing_config).map_err(|e| CliError::Logging(e.to_string()))
}

/// Builds the shared connection settings, prompting for a password when asked.
pub fn connection_config(
    config: &AppConfig,
    ask_password: bool,
) -> Result<Arc<ConnectionConfig>, CliError> {
    let mut connection = config.connection_config();

    if ask_password {
        let prompt = format!("Password for {}: ", connection.destination());
        let password = rpassword::prompt_password(prompt)
            .map_err(|e| CliError::Config(format!("Failed to read password: {e}")))?;
        connection = connection.with_password(SecretString::from(password));
    }

    Ok(Arc::new(connection))
}

/// Creates the multi-threaded runtime the commands run on.
pub fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("Failed to create async runtime: {e}")))
}
