//! Error types for remote metrics collection

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur while collecting metrics from a remote host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitoringError {
    /// The remote session could not be established (network, auth, host key)
    #[error("Connection failed: {0}")]
    Connect(String),
    /// A command could not be dispatched over the session
    #[error("Command dispatch failed: {0}")]
    Command(String),
    /// Command output did not have the expected shape
    #[error("Failed to parse monitoring output: {0}")]
    Parse(String),
    /// A step exceeded its time bound
    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Result type for monitoring operations
pub type MonitoringResult<T> = Result<T, MonitoringError>;

impl MonitoringError {
    /// Shorthand for a [`MonitoringError::Parse`] with a formatted reason
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Returns the kind tag of this error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Connect(_) => FailureKind::Connect,
            Self::Command(_) => FailureKind::Command,
            Self::Parse(_) => FailureKind::Parse,
            Self::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// Kind of failure that ended a collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Session establishment failed
    Connect,
    /// Command dispatch failed
    Command,
    /// Output could not be decoded
    Parse,
    /// A step exceeded its bound
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Command => write!(f, "command"),
            Self::Parse => write!(f, "parse"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Stage of the collection cycle at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Opening the remote session
    Connect,
    /// Running the command battery
    Command,
    /// Decoding command output
    Parse,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Command => write!(f, "command"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

/// Structured failure of one collection cycle
///
/// A cycle produces either a [`super::Snapshot`] or exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} failure during {stage} stage{}: {cause}", command_suffix(.command.as_deref()))]
pub struct CollectionFailure {
    /// What went wrong
    pub kind: FailureKind,
    /// Where in the cycle it went wrong
    pub stage: FailureStage,
    /// The command being run or parsed, if any
    pub command: Option<String>,
    /// Human-readable cause
    pub cause: String,
}

fn command_suffix(command: Option<&str>) -> String {
    command.map_or_else(String::new, |c| format!(" (`{c}`)"))
}

impl CollectionFailure {
    /// Builds a failure from a [`MonitoringError`] raised at `stage`
    #[must_use]
    pub fn new(stage: FailureStage, command: Option<&str>, error: &MonitoringError) -> Self {
        Self {
            kind: error.kind(),
            stage,
            command: command.map(str::to_string),
            cause: error.to_string(),
        }
    }

    /// Failure while opening the session
    #[must_use]
    pub fn connect(error: &MonitoringError) -> Self {
        Self::new(FailureStage::Connect, None, error)
    }

    /// Failure while running `command`
    #[must_use]
    pub fn command(command: &str, error: &MonitoringError) -> Self {
        Self::new(FailureStage::Command, Some(command), error)
    }

    /// Failure while parsing the output of `command`
    #[must_use]
    pub fn parse(command: &str, error: &MonitoringError) -> Self {
        Self::new(FailureStage::Parse, Some(command), error)
    }

    /// Returns true if the cycle ran out of time
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}
