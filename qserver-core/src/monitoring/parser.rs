//! Parsers for remote inspection command output
//!
//! Each parser decodes the text of one command from [`super::probe`].
//! They are pure and fail with [`MonitoringError::Parse`] on any shape they
//! do not recognise rather than guessing a value.

use super::error::{MonitoringError, MonitoringResult};
use super::metrics::{MemoryUsage, ServiceStatuses, StorageAmount, StorageUsage};

/// Marker that precedes the aggregate CPU figures in `top` output
const CPU_MARKER: &str = "Cpu(s):";

/// Key of the distribution name in `/etc/os-release`
const PRETTY_NAME_KEY: &str = "PRETTY_NAME";

/// Stateless parser for remote metrics output
pub struct MetricsParser;

impl MetricsParser {
    /// Parses `free -m` output into total and used megabytes.
    ///
    /// Format (second line): `Mem:  total  used  free  shared  buff/cache  available`
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if the second line is missing,
    /// lacks numeric total/used columns, or reports more used than total.
    pub fn parse_memory(output: &str) -> MonitoringResult<MemoryUsage> {
        let line = output
            .lines()
            .nth(1)
            .ok_or_else(|| MonitoringError::parse("free output has no memory line"))?;

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(MonitoringError::parse(format!(
                "Too few fields in free memory line: {line:?}"
            )));
        }

        let field = |i: usize, name: &str| -> MonitoringResult<u64> {
            parts[i].parse().map_err(|_| {
                MonitoringError::parse(format!("Non-numeric {name} memory field {:?}", parts[i]))
            })
        };
        let total_mb = field(1, "total")?;
        let used_mb = field(2, "used")?;

        if used_mb > total_mb {
            return Err(MonitoringError::parse(format!(
                "Used memory {used_mb}MB exceeds total {total_mb}MB"
            )));
        }

        Ok(MemoryUsage { total_mb, used_mb })
    }

    /// Parses the `%Cpu(s)` line of `top -bn1` into the user-time percentage.
    ///
    /// Accepts `%Cpu(s): 12.3 us, ...`, the older `Cpu(s): 12.3%us, ...` and
    /// the glued `%Cpu(s):100.0 us, ...` forms.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if there is no CPU line or the
    /// user-time token is missing, non-numeric or outside 0–100.
    pub fn parse_cpu(output: &str) -> MonitoringResult<f64> {
        let rest = output
            .lines()
            .find_map(|l| l.split_once(CPU_MARKER).map(|(_, rest)| rest))
            .ok_or_else(|| MonitoringError::parse("No Cpu(s) line in top output"))?;

        let token = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| MonitoringError::parse("Missing user CPU percentage token"))?;

        let value = token.trim_end_matches(['%', 'u', 's', ',']);
        let percent: f64 = value.parse().map_err(|_| {
            MonitoringError::parse(format!("Non-numeric user CPU percentage {token:?}"))
        })?;

        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(MonitoringError::parse(format!(
                "User CPU percentage {percent} out of range"
            )));
        }

        Ok(percent)
    }

    /// Parses the `total` line of `df -h --total`.
    ///
    /// Format: `total  120G  45G  75G  38%  -`
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if there is no `total` line or it
    /// has fewer than three columns.
    pub fn parse_storage(output: &str) -> MonitoringResult<StorageUsage> {
        let parts: Vec<&str> = output
            .lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>())
            .find(|parts| parts.first() == Some(&"total"))
            .ok_or_else(|| MonitoringError::parse("No total line in df output"))?;

        if parts.len() < 3 {
            return Err(MonitoringError::parse("Too few fields in df total line"));
        }

        Ok(StorageUsage {
            total: StorageAmount::new(parts[1]),
            used: StorageAmount::new(parts[2]),
        })
    }

    /// Parses the output of `systemctl is-active <service>`.
    ///
    /// The status is passed through verbatim after trimming; classifying it
    /// as healthy or not is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if nothing was printed.
    pub fn parse_service_status(output: &str) -> MonitoringResult<String> {
        let status = output.trim();
        if status.is_empty() {
            return Err(MonitoringError::parse("Empty service status"));
        }
        Ok(status.to_string())
    }

    /// Pairs configured service names with their status outputs, in order.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if the counts differ or any
    /// status is empty.
    pub fn parse_service_statuses(
        services: &[String],
        outputs: &[&str],
    ) -> MonitoringResult<ServiceStatuses> {
        if services.len() != outputs.len() {
            return Err(MonitoringError::parse(format!(
                "Expected {} service statuses, got {}",
                services.len(),
                outputs.len()
            )));
        }

        let mut statuses = ServiceStatuses::new();
        for (name, output) in services.iter().zip(outputs) {
            statuses.push(name.as_str(), Self::parse_service_status(output)?);
        }
        Ok(statuses)
    }

    /// Extracts the distribution name from a `PRETTY_NAME=...` line.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if no such line exists or the
    /// value is empty.
    pub fn parse_distro_name(output: &str) -> MonitoringResult<String> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with(PRETTY_NAME_KEY))
            .ok_or_else(|| MonitoringError::parse("No PRETTY_NAME in os-release output"))?;

        let (_, value) = line
            .split_once('=')
            .ok_or_else(|| MonitoringError::parse("PRETTY_NAME line has no value"))?;

        let name = value.trim().trim_matches(['"', '\'']).trim();
        if name.is_empty() {
            return Err(MonitoringError::parse("Empty PRETTY_NAME"));
        }
        Ok(name.to_string())
    }

    /// Returns the trimmed `uname -r` output.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if the output is empty.
    pub fn parse_kernel_version(output: &str) -> MonitoringResult<String> {
        Self::non_empty(output, "kernel version")
    }

    /// Returns the trimmed `uptime -p` output.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::Parse`] if the output is empty.
    pub fn parse_uptime(output: &str) -> MonitoringResult<String> {
        Self::non_empty(output, "uptime")
    }

    fn non_empty(output: &str, what: &str) -> MonitoringResult<String> {
        let value = output.trim();
        if value.is_empty() {
            return Err(MonitoringError::parse(format!("Empty {what} output")));
        }
        Ok(value.to_string())
    }
}
