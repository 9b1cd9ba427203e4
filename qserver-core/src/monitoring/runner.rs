//! Transport seams: opening a remote session and running commands on it
//!
//! [`super::SessionCollector`] only talks to these traits, so tests can
//! substitute an in-memory host for the real SSH transport.

use async_trait::async_trait;

use super::error::MonitoringResult;
use super::metrics::RawCommandResult;
use crate::models::ConnectionConfig;

/// Executes single commands over an established session
///
/// Implementations must not interpret command output. A non-zero remote
/// exit code is returned as data, not as an error.
#[async_trait]
pub trait CommandRunner: Send {
    /// Runs `command` remotely and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`super::MonitoringError::Command`] when the command could
    /// not be dispatched.
    async fn run(&mut self, command: &str) -> MonitoringResult<RawCommandResult>;

    /// Releases the session and any transport-level resources.
    async fn close(self: Box<Self>);
}

/// Opens remote sessions
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes one authenticated session to the configured host.
    ///
    /// # Errors
    ///
    /// Returns [`super::MonitoringError::Connect`] on authentication,
    /// network or host-key problems.
    async fn open(&self, config: &ConnectionConfig) -> MonitoringResult<Box<dyn CommandRunner>>;
}
