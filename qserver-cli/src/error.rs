//! CLI error types and exit codes.

use qserver_core::{CollectionFailure, ConfigError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, IO or runtime errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Collection failure - the host could not be probed
    pub const COLLECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collection cycle failed
    #[error("Collection failed: {0}")]
    Collection(#[from] CollectionFailure),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, logging, runtime, IO)
    /// - 2: Collection failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Collection(_) => exit_codes::COLLECTION_FAILURE,
            Self::Config(_) | Self::Logging(_) | Self::Runtime(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
