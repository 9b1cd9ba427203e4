//! One collection cycle: open a session, run every probe, parse, assemble
//!
//! A cycle is all-or-nothing. It yields a complete [`Snapshot`] or exactly
//! one [`CollectionFailure`] describing the first problem hit. The session
//! is closed before any parsing starts, and dropped if the cycle itself is
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::Instrument;

use super::error::{CollectionFailure, MonitoringError};
use super::metrics::{RawCommandResult, ServiceStatuses, Snapshot};
use super::parser::MetricsParser;
use super::probe::Probe;
use super::runner::{CommandRunner, Transport};
use super::settings::MonitoringSettings;
use crate::models::{ConnectionConfig, ConnectionConfigError};
use crate::tracing::span_names;

/// Result of one collection cycle
pub type CollectionOutcome = Result<Snapshot, CollectionFailure>;

/// Anything that can run a collection cycle on demand
#[async_trait]
pub trait Collector: Send + Sync {
    /// Runs one cycle and reports its outcome
    async fn collect(&self) -> CollectionOutcome;
}

/// Collects snapshots over a fresh session per cycle
pub struct SessionCollector<T> {
    transport: T,
    config: Arc<ConnectionConfig>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl<T: Transport> SessionCollector<T> {
    /// Creates a collector with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(transport: T, config: Arc<ConnectionConfig>) -> Result<Self, ConnectionConfigError> {
        Self::with_settings(transport, config, &MonitoringSettings::default())
    }

    /// Creates a collector using the timeouts from `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn with_settings(
        transport: T,
        config: Arc<ConnectionConfig>,
        settings: &MonitoringSettings,
    ) -> Result<Self, ConnectionConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            connect_timeout: settings.connect_timeout(),
            command_timeout: settings.command_timeout(),
        })
    }

    /// Overrides the session-open timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the per-command timeout
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// The connection this collector targets
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Runs one full cycle.
    pub async fn collect_once(&self) -> CollectionOutcome {
        let span = tracing::info_span!(
            span_names::CYCLE_COLLECT,
            host = %self.config.host,
            services = self.config.services.len(),
        );

        async {
            let started = std::time::Instant::now();
            let outcome = self.run_cycle().await;
            match &outcome {
                Ok(_) => tracing::debug!(
                    elapsed_ms = started.elapsed().as_millis(),
                    "Collection cycle completed"
                ),
                Err(failure) => tracing::warn!(
                    kind = %failure.kind,
                    stage = %failure.stage,
                    command = failure.command.as_deref().unwrap_or(""),
                    "Collection cycle failed: {}",
                    failure.cause
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_cycle(&self) -> CollectionOutcome {
        let probes = Probe::battery(&self.config.services);

        let mut session = self.open_session().await?;
        let probed = self.run_probes(session.as_mut(), &probes).await;
        session.close().await;

        assemble(&probes, &probed?)
    }

    async fn open_session(&self) -> Result<Box<dyn CommandRunner>, CollectionFailure> {
        let open = self
            .transport
            .open(&self.config)
            .instrument(tracing::debug_span!(span_names::SESSION_OPEN));

        match tokio::time::timeout(self.connect_timeout, open).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(CollectionFailure::connect(&e)),
            Err(_) => Err(CollectionFailure::connect(&MonitoringError::Timeout(
                self.connect_timeout,
            ))),
        }
    }

    async fn run_probes(
        &self,
        session: &mut dyn CommandRunner,
        probes: &[Probe],
    ) -> Result<Vec<RawCommandResult>, CollectionFailure> {
        let mut results = Vec::with_capacity(probes.len());

        for probe in probes {
            let command = probe.command();
            let run = session
                .run(&command)
                .instrument(tracing::debug_span!(span_names::COMMAND_RUN, probe = %probe));

            let raw = match tokio::time::timeout(self.command_timeout, run).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => return Err(CollectionFailure::command(&command, &e)),
                Err(_) => {
                    return Err(CollectionFailure::command(
                        &command,
                        &MonitoringError::Timeout(self.command_timeout),
                    ));
                }
            };

            if !raw.succeeded() {
                tracing::debug!(
                    probe = %probe,
                    exit_code = ?raw.exit_code,
                    "Probe exited non-zero"
                );
            }
            results.push(raw);
        }

        Ok(results)
    }
}

#[async_trait]
impl<T: Transport> Collector for SessionCollector<T> {
    async fn collect(&self) -> CollectionOutcome {
        self.collect_once().await
    }
}

/// Parses probe output into a snapshot, stopping at the first bad output
fn assemble(probes: &[Probe], results: &[RawCommandResult]) -> CollectionOutcome {
    let mut memory = None;
    let mut cpu_percent = None;
    let mut storage = None;
    let mut distro_name = None;
    let mut kernel_version = None;
    let mut uptime = None;
    let mut services = ServiceStatuses::new();

    for (probe, raw) in probes.iter().zip(results) {
        let fail = |e: MonitoringError| parse_failure(raw, &e);
        let out = raw.stdout.as_str();

        match probe {
            Probe::Memory => memory = Some(MetricsParser::parse_memory(out).map_err(fail)?),
            Probe::Cpu => cpu_percent = Some(MetricsParser::parse_cpu(out).map_err(fail)?),
            Probe::Storage => storage = Some(MetricsParser::parse_storage(out).map_err(fail)?),
            Probe::Service(name) => {
                services.push(
                    name.as_str(),
                    MetricsParser::parse_service_status(out).map_err(fail)?,
                );
            }
            Probe::OsRelease => {
                distro_name = Some(MetricsParser::parse_distro_name(out).map_err(fail)?);
            }
            Probe::Kernel => {
                kernel_version = Some(MetricsParser::parse_kernel_version(out).map_err(fail)?);
            }
            Probe::Uptime => uptime = Some(MetricsParser::parse_uptime(out).map_err(fail)?),
        }
    }

    Ok(Snapshot {
        memory: require(memory, &Probe::Memory)?,
        cpu_percent: require(cpu_percent, &Probe::Cpu)?,
        storage: require(storage, &Probe::Storage)?,
        services,
        distro_name: require(distro_name, &Probe::OsRelease)?,
        kernel_version: require(kernel_version, &Probe::Kernel)?,
        uptime: require(uptime, &Probe::Uptime)?,
        collected_at: Utc::now(),
    })
}

fn parse_failure(raw: &RawCommandResult, error: &MonitoringError) -> CollectionFailure {
    let mut failure = CollectionFailure::parse(&raw.command, error);
    let stderr = raw.stderr.trim();
    if !stderr.is_empty() {
        failure.cause = format!("{} (stderr: {stderr})", failure.cause);
    }
    failure
}

fn require<V>(value: Option<V>, probe: &Probe) -> Result<V, CollectionFailure> {
    value.ok_or_else(|| {
        CollectionFailure::parse(
            &probe.command(),
            &MonitoringError::parse(format!("No output collected for {probe}")),
        )
    })
}
