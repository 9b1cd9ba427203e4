//! Connection parameters for the monitored host

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::SecretString;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Characters allowed in a service name. Names are interpolated into a
/// remote shell command, so anything outside this set is rejected.
static SERVICE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9@._:-]+$").expect("SERVICE_NAME_REGEX is a valid regex pattern")
});

/// Errors found while validating a [`ConnectionConfig`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionConfigError {
    /// Host is empty
    #[error("Host must not be empty")]
    EmptyHost,
    /// Port is zero
    #[error("Port must be between 1 and 65535")]
    InvalidPort,
    /// Username is empty
    #[error("Username must not be empty")]
    EmptyUsername,
    /// A service name contains characters unsafe for a shell command
    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),
    /// A service is listed more than once
    #[error("Duplicate service name: {0}")]
    DuplicateService(String),
}

/// How to treat the remote host key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyChecking {
    /// Only connect to hosts already in `known_hosts`
    Strict,
    /// Record unknown hosts, refuse changed keys
    #[default]
    AcceptNew,
    /// Accept any host key
    Off,
}

impl HostKeyChecking {
    /// Value for OpenSSH's `StrictHostKeyChecking` option
    #[must_use]
    pub const fn ssh_option(self) -> &'static str {
        match self {
            Self::Strict => "yes",
            Self::AcceptNew => "accept-new",
            Self::Off => "no",
        }
    }
}

/// Everything needed to open a session to the monitored host
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Login name
    pub username: String,
    /// Password, if password authentication is used
    pub password: Option<SecretString>,
    /// Private key file, if key authentication is used
    pub identity_file: Option<PathBuf>,
    /// Services to probe, in display order
    pub services: Vec<String>,
    /// Host key policy
    pub host_key_checking: HostKeyChecking,
}

impl ConnectionConfig {
    /// Creates a config for `username@host` on the default port
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            password: None,
            identity_file: None,
            services: Vec::new(),
            host_key_checking: HostKeyChecking::default(),
        }
    }

    /// Sets the port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password
    #[must_use]
    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Sets the private key file
    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Sets the services to probe
    #[must_use]
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the host key policy
    #[must_use]
    pub const fn with_host_key_checking(mut self, policy: HostKeyChecking) -> Self {
        self.host_key_checking = policy;
        self
    }

    /// `user@host` destination string
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Checks that the config can be turned into remote commands safely.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConnectionConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConnectionConfigError::InvalidPort);
        }
        if self.username.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyUsername);
        }
        for (i, service) in self.services.iter().enumerate() {
            if !is_valid_service_name(service) {
                return Err(ConnectionConfigError::InvalidServiceName(service.clone()));
            }
            if self.services[..i].contains(service) {
                return Err(ConnectionConfigError::DuplicateService(service.clone()));
            }
        }
        Ok(())
    }
}

/// Returns true if `name` is safe to pass to `systemctl is-active`
#[must_use]
pub fn is_valid_service_name(name: &str) -> bool {
    SERVICE_NAME_REGEX.is_match(name)
}
