//! Data models for remote host metrics
//!
//! All types are GUI-free and serializable so any presentation layer can
//! consume them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string `systemctl is-active` reports for a running unit
pub const ACTIVE_STATUS: &str = "active";

/// Raw output of a single remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommandResult {
    /// The command string that was issued
    pub command: String,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code, absent if the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl RawCommandResult {
    /// Returns true if the command exited with status 0
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Memory usage in megabytes as reported by `free -m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Total physical memory (MB)
    pub total_mb: u64,
    /// Used memory (MB)
    pub used_mb: u64,
}

impl MemoryUsage {
    /// Returns memory usage as a percentage, or `None` if the total is zero
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        ratio_percent(self.used_mb as f64, self.total_mb as f64)
    }
}

/// A human-formatted storage size such as `"120G"` from `df -h`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageAmount(String);

impl StorageAmount {
    /// Wraps a size token verbatim
    #[must_use]
    pub fn new(display: impl Into<String>) -> Self {
        Self(display.into())
    }

    /// The size exactly as the remote host printed it
    #[must_use]
    pub fn display(&self) -> &str {
        &self.0
    }

    /// Numeric value with the trailing unit character stripped
    ///
    /// `"120G"` gives `120.0`. A token without a unit (`"0"`) is parsed
    /// whole. Returns `None` when the remainder is not a number.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        let (number, _) = self.split_unit();
        number.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Size in bytes, applying the binary unit suffix used by `df -h`
    #[must_use]
    pub fn bytes(&self) -> Option<f64> {
        let (_, unit) = self.split_unit();
        let multiplier = match unit {
            None | Some('B') => 1.0,
            Some('K') => 1024.0,
            Some('M') => 1024.0_f64.powi(2),
            Some('G') => 1024.0_f64.powi(3),
            Some('T') => 1024.0_f64.powi(4),
            Some('P') => 1024.0_f64.powi(5),
            Some('E') => 1024.0_f64.powi(6),
            Some(_) => return None,
        };
        self.numeric().map(|v| v * multiplier)
    }

    fn split_unit(&self) -> (&str, Option<char>) {
        match self.0.chars().last() {
            Some(c) if !c.is_ascii_digit() => (&self.0[..self.0.len() - c.len_utf8()], Some(c)),
            _ => (self.0.as_str(), None),
        }
    }
}

impl std::fmt::Display for StorageAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate filesystem usage from `df -h --total`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Total size across all filesystems
    pub total: StorageAmount,
    /// Used size across all filesystems
    pub used: StorageAmount,
}

impl StorageUsage {
    /// Returns storage usage as a percentage
    ///
    /// Returns `None` when either size cannot be reduced to a number or
    /// the total is zero.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        let used = self.used.bytes()?;
        let total = self.total.bytes()?;
        ratio_percent(used, total)
    }
}

/// Status of one configured service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Service name exactly as configured
    pub name: String,
    /// Trimmed status text (`active`, `inactive`, `failed`, ...)
    pub status: String,
}

impl ServiceStatus {
    /// Returns true if the service reported `active`
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

/// Service name to status mapping in configured order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceStatuses(Vec<ServiceStatus>);

impl ServiceStatuses {
    /// Creates an empty mapping
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a status, keeping insertion order
    pub fn push(&mut self, name: impl Into<String>, status: impl Into<String>) {
        self.0.push(ServiceStatus {
            name: name.into(),
            status: status.into(),
        });
    }

    /// Looks up the status of a service by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status.as_str())
    }

    /// Iterates in configured order
    pub fn iter(&self) -> std::slice::Iter<'_, ServiceStatus> {
        self.0.iter()
    }

    /// Number of services
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no services were probed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Services whose status is anything other than `active`
    pub fn unhealthy(&self) -> impl Iterator<Item = &ServiceStatus> {
        self.0.iter().filter(|s| !s.is_active())
    }
}

impl<'a> IntoIterator for &'a ServiceStatuses {
    type Item = &'a ServiceStatus;
    type IntoIter = std::slice::Iter<'a, ServiceStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One complete, internally consistent set of metrics from a remote host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Memory usage
    pub memory: MemoryUsage,
    /// CPU user-time percentage (0.0–100.0)
    pub cpu_percent: f64,
    /// Aggregate storage usage
    pub storage: StorageUsage,
    /// Service statuses in configured order
    pub services: ServiceStatuses,
    /// Distribution display name (e.g. "Ubuntu 24.04.1 LTS")
    pub distro_name: String,
    /// Kernel release (e.g. "6.8.0-45-generic")
    pub kernel_version: String,
    /// Uptime as printed by `uptime -p`
    pub uptime: String,
    /// When the snapshot was assembled
    pub collected_at: DateTime<Utc>,
}

impl Snapshot {
    /// Memory usage percentage, `None` when total memory is zero
    #[must_use]
    pub fn memory_percent(&self) -> Option<f64> {
        self.memory.percent()
    }

    /// Storage usage percentage, `None` when unavailable
    #[must_use]
    pub fn storage_percent(&self) -> Option<f64> {
        self.storage.percent()
    }

    /// Returns true if every configured service is `active`
    #[must_use]
    pub fn all_services_active(&self) -> bool {
        self.services.unhealthy().next().is_none()
    }
}

fn ratio_percent(used: f64, total: f64) -> Option<f64> {
    if total <= 0.0 {
        return None;
    }
    Some(used / total * 100.0)
}
