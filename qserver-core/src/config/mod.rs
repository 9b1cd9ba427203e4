//! Configuration file loading
//!
//! The monitor reads a single TOML file:
//!
//! ```toml
//! [ssh]
//! hostname = "192.0.2.10"
//! username = "monitor"
//! services = ["nginx", "redis"]
//!
//! [monitoring]
//! interval_secs = 5
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! `services` also accepts the comma-separated form `"nginx,redis"`.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::{ConnectionConfig, ConnectionConfigError, DEFAULT_SSH_PORT, HostKeyChecking};
use crate::monitoring::MonitoringSettings;
use crate::tracing::{TracingLevel, span_names};

/// Environment variable that overrides `ssh.password`
pub const PASSWORD_ENV: &str = "QSERVER_PASSWORD";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values are well-formed but unusable
    #[error("Invalid connection settings: {0}")]
    Validation(#[from] ConnectionConfigError),

    /// No platform configuration directory
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Contents of `config.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Connection settings
    pub ssh: SshSection,
    /// Polling cadence and time bounds
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    /// Log output
    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[ssh]` table
#[derive(Debug, Clone, Deserialize)]
pub struct SshSection {
    /// Host name or address
    pub hostname: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login name
    pub username: String,
    /// Password for password authentication
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    /// Private key for key authentication
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    /// Services to check
    #[serde(default)]
    pub services: ServiceList,
    /// Host key policy
    #[serde(default)]
    pub host_key_checking: HostKeyChecking,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default)]
    pub level: TracingLevel,
    /// Log file; stderr when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Service names, written either as a TOML array or a comma-separated string
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ServiceListRepr")]
pub struct ServiceList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ServiceListRepr {
    List(Vec<String>),
    Csv(String),
}

impl From<ServiceListRepr> for ServiceList {
    fn from(repr: ServiceListRepr) -> Self {
        let names = match repr {
            ServiceListRepr::List(names) => names,
            ServiceListRepr::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        Self(
            names
                .into_iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }
}

impl ServiceList {
    /// Names in configured order
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl AppConfig {
    /// `<config dir>/qserver/config.toml`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has no
    /// configuration directory.
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("qserver").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let _span = tracing::debug_span!(span_names::CONFIG_LOAD, path = %path.display()).entered();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;

        tracing::debug!(
            host = %config.ssh.hostname,
            username = %config.ssh.username,
            services = config.ssh.services.as_slice().len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the connection settings.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.build_connection_config(None).validate()?;
        Ok(())
    }

    /// Connection settings, with the password taken from
    /// `QSERVER_PASSWORD` when that variable is set.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        let env_password = std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(SecretString::from);
        self.build_connection_config(env_password)
    }

    fn build_connection_config(&self, password_override: Option<SecretString>) -> ConnectionConfig {
        let ssh = &self.ssh;
        let mut config = ConnectionConfig::new(ssh.hostname.trim(), ssh.username.trim())
            .with_port(ssh.port)
            .with_services(ssh.services.as_slice().iter().cloned())
            .with_host_key_checking(ssh.host_key_checking);

        if let Some(password) = password_override.or_else(|| ssh.password.clone()) {
            config = config.with_password(password);
        }
        if let Some(key) = &ssh.identity_file {
            config = config.with_identity_file(key);
        }
        config
    }
}
