//! The fixed battery of inspection commands
//!
//! These command strings are a contract with [`super::MetricsParser`]:
//! changing one means changing the matching parser.

use std::fmt;

/// Memory summary in megabytes
pub const MEMORY_COMMAND: &str = "free -m";

/// Aggregate CPU statistics line from a single `top` iteration
pub const CPU_COMMAND: &str = "top -bn1 | grep '%Cpu(s)'";

/// Aggregate filesystem usage total line
pub const STORAGE_COMMAND: &str = "df -h --total | grep total";

/// Distribution display name from OS release metadata
pub const OS_RELEASE_COMMAND: &str = "cat /etc/os-release | grep PRETTY_NAME";

/// Kernel release
pub const KERNEL_COMMAND: &str = "uname -r";

/// Uptime in words
pub const UPTIME_COMMAND: &str = "uptime -p";

/// Builds the active-check command for one service
#[must_use]
pub fn service_status_command(service: &str) -> String {
    format!("systemctl is-active {service}")
}

/// One inspection step of a collection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// `free -m`
    Memory,
    /// `top` CPU summary
    Cpu,
    /// `df -h --total`
    Storage,
    /// `systemctl is-active <name>`
    Service(String),
    /// `/etc/os-release` pretty name
    OsRelease,
    /// `uname -r`
    Kernel,
    /// `uptime -p`
    Uptime,
}

impl Probe {
    /// The exact command string issued for this probe
    #[must_use]
    pub fn command(&self) -> String {
        match self {
            Self::Memory => MEMORY_COMMAND.to_string(),
            Self::Cpu => CPU_COMMAND.to_string(),
            Self::Storage => STORAGE_COMMAND.to_string(),
            Self::Service(name) => service_status_command(name),
            Self::OsRelease => OS_RELEASE_COMMAND.to_string(),
            Self::Kernel => KERNEL_COMMAND.to_string(),
            Self::Uptime => UPTIME_COMMAND.to_string(),
        }
    }

    /// Full battery for a host, services in configured order
    #[must_use]
    pub fn battery(services: &[String]) -> Vec<Self> {
        let mut probes = Vec::with_capacity(services.len() + 6);
        probes.extend([Self::Memory, Self::Cpu, Self::Storage]);
        probes.extend(services.iter().cloned().map(Self::Service));
        probes.extend([Self::OsRelease, Self::Kernel, Self::Uptime]);
        probes
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Cpu => write!(f, "cpu"),
            Self::Storage => write!(f, "storage"),
            Self::Service(name) => write!(f, "service:{name}"),
            Self::OsRelease => write!(f, "os-release"),
            Self::Kernel => write!(f, "kernel"),
            Self::Uptime => write!(f, "uptime"),
        }
    }
}
