//! Remote host health collection
//!
//! A collection cycle opens one session to the configured host, runs a
//! fixed battery of read-only shell commands, parses their text output and
//! assembles a [`Snapshot`]. The [`Scheduler`] repeats that on an interval
//! without ever letting two cycles overlap.
//!
//! The module is presentation-free. Consumers receive a
//! [`CollectionOutcome`] per cycle and decide how to show it.

mod collector;
mod error;
mod metrics;
mod parser;
mod probe;
mod runner;
mod scheduler;
mod settings;
pub mod ssh_exec;

pub use collector::{CollectionOutcome, Collector, SessionCollector};
pub use error::{CollectionFailure, FailureKind, FailureStage, MonitoringError, MonitoringResult};
pub use metrics::{
    ACTIVE_STATUS, MemoryUsage, RawCommandResult, ServiceStatus, ServiceStatuses, Snapshot,
    StorageAmount, StorageUsage,
};
pub use parser::MetricsParser;
pub use probe::{
    CPU_COMMAND, KERNEL_COMMAND, MEMORY_COMMAND, OS_RELEASE_COMMAND, Probe, STORAGE_COMMAND,
    UPTIME_COMMAND, service_status_command,
};
pub use runner::{CommandRunner, Transport};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};
pub use settings::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_INTERVAL_SECS,
    MonitoringSettings,
};
pub use ssh_exec::{SshSession, SshTransport};
