//! `QServer` Core Library
//!
//! Agentless health monitoring for a single remote Linux host over SSH.
//!
//! # Crate Structure
//!
//! - [`models`] - Connection parameters and their validation
//! - [`monitoring`] - Probes, output parsers, the collection cycle and the scheduler
//! - [`config`] - TOML configuration file loading
//! - [`tracing`] - Structured logging setup
//! - [`testing`] - Scripted in-memory host for exercising the collector

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod models;
pub mod monitoring;
pub mod testing;
pub mod tracing;

pub use config::{AppConfig, ConfigError, ConfigResult, PASSWORD_ENV};
pub use models::{ConnectionConfig, ConnectionConfigError, HostKeyChecking};
pub use monitoring::{
    CollectionFailure, CollectionOutcome, Collector, FailureKind, FailureStage, MetricsParser,
    MonitoringError, MonitoringResult, MonitoringSettings, Scheduler, SchedulerHandle,
    SchedulerStats, SessionCollector, Snapshot, SshTransport,
};
pub use tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult, init_tracing,
};
