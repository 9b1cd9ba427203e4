//! Rendering of collection outcomes for the terminal.

use chrono::{DateTime, Local, Utc};
use qserver_core::{CollectionFailure, CollectionOutcome, Snapshot};
use serde_json::json;

use crate::cli::OutputFormat;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Formats outcomes in the selected style
#[derive(Debug, Clone, Copy)]
pub struct OutcomeFormatter {
    format: OutputFormat,
    color: bool,
}

impl OutcomeFormatter {
    pub const fn new(format: OutputFormat, color: bool) -> Self {
        Self { format, color }
    }

    /// One line, without a trailing newline
    pub fn render(&self, outcome: &CollectionOutcome) -> String {
        match (self.format, outcome) {
            (OutputFormat::Text, Ok(snapshot)) => self.snapshot_text(snapshot),
            (OutputFormat::Text, Err(failure)) => self.failure_text(failure, Utc::now()),
            (OutputFormat::Json, Ok(snapshot)) => snapshot_json(snapshot).to_string(),
            (OutputFormat::Json, Err(failure)) => failure_json(failure, Utc::now()).to_string(),
        }
    }

    fn snapshot_text(&self, s: &Snapshot) -> String {
        let mut line = format!(
            "{} {} | {} | {} | RAM {}/{}M ({}) | CPU {:.1}% | Disk {} / {} ({})",
            self.paint(DIM, &timestamp(s.collected_at)),
            s.distro_name,
            s.kernel_version,
            s.uptime,
            s.memory.used_mb,
            s.memory.total_mb,
            percent(s.memory_percent()),
            s.cpu_percent,
            s.storage.used,
            s.storage.total,
            percent(s.storage_percent()),
        );

        if !s.services.is_empty() {
            line.push_str(" |");
            for service in &s.services {
                let color = if service.is_active() { GREEN } else { RED };
                line.push(' ');
                line.push_str(&service.name);
                line.push('=');
                line.push_str(&self.paint(color, &service.status));
            }
        }
        line
    }

    fn failure_text(&self, failure: &CollectionFailure, at: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            self.paint(DIM, &timestamp(at)),
            self.paint(RED, &format!("collection failed: {failure}"))
        )
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    format!("[{}]", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"))
}

fn snapshot_json(s: &Snapshot) -> serde_json::Value {
    json!({
        "ok": true,
        "snapshot": s,
        "memory_percent": s.memory_percent(),
        "storage_percent": s.storage_percent(),
        "all_services_active": s.all_services_active(),
    })
}

fn failure_json(failure: &CollectionFailure, at: DateTime<Utc>) -> serde_json::Value {
    json!({
        "ok": false,
        "failure": failure,
        "failed_at": at,
    })
}

#[cfg(test)]
mod tests {
    use qserver_core::monitoring::{
        MemoryUsage, ServiceStatuses, StorageAmount, StorageUsage,
    };
    use qserver_core::MonitoringError;

    use super::*;

    fn snapshot(total_mb: u64) -> Snapshot {
        let mut services = ServiceStatuses::new();
        services.push("nginx", "active");
        services.push("redis", "failed");
        Snapshot {
            memory: MemoryUsage {
                total_mb,
                used_mb: total_mb / 2,
            },
            cpu_percent: 12.3,
            storage: StorageUsage {
                total: StorageAmount::new("120G"),
                used: StorageAmount::new("45G"),
            },
            services,
            distro_name: "Debian GNU/Linux 12 (bookworm)".into(),
            kernel_version: "6.1.0-26-amd64".into(),
            uptime: "up 2 hours".into(),
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_plain_text_line() {
        let line = OutcomeFormatter::new(OutputFormat::Text, false).render(&Ok(snapshot(8000)));
        assert!(line.contains("Debian GNU/Linux 12 (bookworm) | 6.1.0-26-amd64 | up 2 hours"));
        assert!(line.contains("RAM 4000/8000M (50.0%)"));
        assert!(line.contains("CPU 12.3%"));
        assert!(line.contains("Disk 45G / 120G (37.5%)"));
        assert!(line.ends_with("nginx=active redis=failed"));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_zero_memory_prints_not_available() {
        let line = OutcomeFormatter::new(OutputFormat::Text, false).render(&Ok(snapshot(0)));
        assert!(line.contains("RAM 0/0M (n/a)"));
    }

    #[test]
    fn test_service_colors() {
        let line = OutcomeFormatter::new(OutputFormat::Text, true).render(&Ok(snapshot(8000)));
        assert!(line.contains(&format!("nginx={GREEN}active{RESET}")));
        assert!(line.contains(&format!("redis={RED}failed{RESET}")));
    }

    #[test]
    fn test_failure_text() {
        let failure = CollectionFailure::connect(&MonitoringError::Connect("refused".into()));
        let line = OutcomeFormatter::new(OutputFormat::Text, false).render(&Err(failure));
        assert!(line.contains("collection failed: connect failure during connect stage"));
    }

    #[test]
    fn test_json_snapshot() {
        let line = OutcomeFormatter::new(OutputFormat::Json, false).render(&Ok(snapshot(8000)));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["snapshot"]["memory"]["total_mb"], 8000);
        assert_eq!(value["snapshot"]["storage"]["total"], "120G");
        assert_eq!(value["snapshot"]["services"][1]["status"], "failed");
        assert_eq!(value["all_services_active"], false);
    }

    #[test]
    fn test_json_failure() {
        let failure = CollectionFailure::parse(
            "free -m",
            &MonitoringError::Parse("Missing Mem line".into()),
        );
        let line = OutcomeFormatter::new(OutputFormat::Json, false).render(&Err(failure));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["failure"]["kind"], "parse");
        assert_eq!(value["failure"]["stage"], "parse");
        assert_eq!(value["failure"]["command"], "free -m");
    }
}
