//! Structured logging setup and span names
//!
//! The collection cycle, session handling and scheduler emit `tracing`
//! events under the span names in [`span_names`]. Binaries call
//! [`init_tracing`] once at startup to route them to stderr or a file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Set by the first successful [`init_tracing`] call
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Why the log subscriber could not be installed
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber or its filter was rejected
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// A global subscriber is already installed
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The log file could not be opened for appending
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Unrecognised log level name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: {0}")]
pub struct ParseLevelError(String);

/// Verbosity of emitted events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingLevel {
    /// Only errors
    Error,
    /// Errors and warnings (failed cycles are logged here)
    #[default]
    Warn,
    /// Lifecycle messages
    Info,
    /// Per-cycle and per-probe detail
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Maximum `tracing` level enabled by this verbosity
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// This level raised by `steps` (one per `-v` on the command line).
    ///
    /// Each step raises the level by one, saturating at `Trace`.
    #[must_use]
    pub const fn raised_by(self, steps: u8) -> Self {
        let mut level = self;
        let mut i = 0;
        while i < steps {
            level = match level {
                Self::Error => Self::Warn,
                Self::Warn => Self::Info,
                Self::Info => Self::Debug,
                Self::Debug | Self::Trace => Self::Trace,
            };
            i += 1;
        }
        level
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard error
    #[default]
    Stderr,
    /// Append to a file
    File {
        /// Log file, created if missing
        path: PathBuf,
    },
}

/// Settings for [`init_tracing`]
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Verbosity
    pub level: TracingLevel,
    /// Destination
    pub output: TracingOutput,
    /// Whether to colour the output
    pub ansi: bool,
    /// `EnvFilter` directive replacing the level-based default
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Warn-level logging to stderr without colour
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the verbosity
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets where lines go
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables or disables ANSI colours
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Replaces the default filter directive
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Filter directive used when no custom filter is set
    #[must_use]
    pub fn default_directive(&self) -> String {
        format!("qserver_core={level},qserver={level}", level = self.level)
    }
}

/// Installs the global log subscriber
///
/// Call once at startup. Subsequent calls return an error. A failed call
/// leaves nothing installed and may be retried.
///
/// # Errors
///
/// Returns an error if tracing is already initialized, the filter is
/// invalid, or the log file cannot be opened.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    if let Err(e) = install_subscriber(config) {
        TRACING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(e);
    }

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

fn install_subscriber(config: &TracingConfig) -> TracingResult<()> {
    let filter = match &config.filter {
        Some(custom) => EnvFilter::try_new(custom)
            .map_err(|e| TracingError::InitializationFailed(e.to_string()))?,
        None => EnvFilter::try_new(config.default_directive())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let (writer, ansi) = match &config.output {
        TracingOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), config.ansi),
        TracingOutput::File { path } => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    TracingError::FileCreationFailed(format!("{}: {e}", path.display()))
                })?;
            (BoxMakeWriter::new(file), false)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))
}

/// Whether [`init_tracing`] has already run
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Standard span names
pub mod span_names {
    /// One collection cycle
    pub const CYCLE_COLLECT: &str = "cycle.collect";
    /// Opening the remote session
    pub const SESSION_OPEN: &str = "session.open";
    /// One remote command
    pub const COMMAND_RUN: &str = "command.run";
    /// One scheduler tick
    pub const SCHEDULER_TICK: &str = "scheduler.tick";
    /// Loading the configuration file
    pub const CONFIG_LOAD: &str = "config.load";
}
