//! Monitoring settings: polling cadence and time bounds
//!
//! Stored in `config.toml` under `[monitoring]`. Out-of-range values are
//! clamped by the `effective_*` accessors rather than rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default polling interval (seconds)
pub const DEFAULT_INTERVAL_SECS: u32 = 5;

/// Default bound for opening a session (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u32 = 10;

/// Default bound for a single remote command (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u32 = 10;

const MAX_INTERVAL_SECS: u32 = 3600;
const MAX_TIMEOUT_SECS: u32 = 300;

/// Settings for the collection cycle and scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Polling interval in seconds (1–3600, default: 5)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
    /// Session open timeout in seconds (1–300, default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u32,
    /// Per-command timeout in seconds (1–300, default: 10)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u32,
}

const fn default_interval_secs() -> u32 {
    DEFAULT_INTERVAL_SECS
}

const fn default_connect_timeout_secs() -> u32 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_command_timeout_secs() -> u32 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl MonitoringSettings {
    /// Returns the interval clamped to the valid range (1–3600 seconds)
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u32 {
        clamp(self.interval_secs, MAX_INTERVAL_SECS)
    }

    /// Polling interval as a [`Duration`]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.effective_interval_secs() as u64)
    }

    /// Session open timeout as a [`Duration`]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(clamp(self.connect_timeout_secs, MAX_TIMEOUT_SECS) as u64)
    }

    /// Per-command timeout as a [`Duration`]
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(clamp(self.command_timeout_secs, MAX_TIMEOUT_SECS) as u64)
    }
}

const fn clamp(value: u32, max: u32) -> u32 {
    if value == 0 {
        1
    } else if value > max {
        max
    } else {
        value
    }
}
