//! SSH transport for monitoring
//!
//! Opens one OpenSSH `ControlMaster` connection per collection cycle (via
//! `sshpass -e ssh` for password-authenticated hosts) and multiplexes every
//! probe command over its control socket. Closing the session, or dropping
//! it, tears the master down and removes the socket directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use super::error::{MonitoringError, MonitoringResult};
use super::metrics::RawCommandResult;
use super::runner::{CommandRunner, Transport};
use crate::models::ConnectionConfig;

/// Default `ConnectTimeout` passed to `ssh` (seconds)
pub const DEFAULT_SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Delay between control-socket readiness checks
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for `ssh -O exit` during session close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Exit status `ssh` uses for its own errors
const SSH_ERROR_STATUS: i32 = 255;

/// Opens SSH sessions by spawning the system `ssh` client
#[derive(Debug, Clone)]
pub struct SshTransport {
    connect_timeout_secs: u64,
    sshpass_available: bool,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SSH_CONNECT_TIMEOUT_SECS)
    }
}

impl SshTransport {
    /// Creates a transport, checking for `sshpass` once up front
    #[must_use]
    pub fn new(connect_timeout_secs: u64) -> Self {
        let sshpass_available = std::process::Command::new("sshpass")
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok();

        Self {
            connect_timeout_secs: connect_timeout_secs.max(1),
            sshpass_available,
        }
    }

    /// Builds the command that starts the master connection
    fn master_command(&self, config: &ConnectionConfig, control_path: &Path) -> Command {
        let mut cmd;

        if let Some(password) = &config.password {
            cmd = Command::new("sshpass");
            cmd.arg("-e").arg("ssh");
            // sshpass reads SSHPASS with -e
            cmd.env("SSHPASS", password.expose_secret());
            cmd.arg("-o").arg("NumberOfPasswordPrompts=1");
        } else {
            cmd = Command::new("ssh");
            // Batch mode only when NOT using password auth
            cmd.arg("-o").arg("BatchMode=yes");
        }

        cmd.arg("-o").arg(format!(
            "StrictHostKeyChecking={}",
            config.host_key_checking.ssh_option()
        ));
        cmd.arg("-o").arg(format!("ConnectTimeout={}", self.connect_timeout_secs));
        cmd.arg("-o").arg("ControlMaster=yes");
        cmd.arg("-o").arg(format!("ControlPath={}", control_path.display()));
        cmd.arg("-o").arg("ControlPersist=no");
        cmd.arg("-p").arg(config.port.to_string());

        if let Some(key) = &config.identity_file {
            let key = key.to_string_lossy();
            cmd.arg("-i").arg(shellexpand::tilde(&key).as_ref());
        }

        cmd.arg("-N").arg(config.destination());

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open(&self, config: &ConnectionConfig) -> MonitoringResult<Box<dyn CommandRunner>> {
        if config.password.is_some() && !self.sshpass_available {
            return Err(MonitoringError::Connect(
                "Password authentication requires sshpass, which was not found".into(),
            ));
        }

        let control_dir = tempfile::Builder::new()
            .prefix("qserver-")
            .tempdir()
            .map_err(|e| MonitoringError::Connect(format!("Failed to create control dir: {e}")))?;
        let socket = ControlSocket {
            path: control_dir.path().join("ctl"),
            dir: Some(control_dir),
            destination: config.destination(),
            port: config.port,
        };

        tracing::debug!(
            host = %config.host,
            port = config.port,
            username = %config.username,
            "Opening SSH master connection"
        );

        let mut master = self
            .master_command(config, &socket.path)
            .spawn()
            .map_err(|e| MonitoringError::Connect(format!("Failed to spawn SSH process: {e}")))?;

        // On error both the child (kill_on_drop) and the socket dir are dropped
        socket.wait_until_ready(&mut master).await?;

        Ok(Box::new(SshSession { master, socket }))
    }
}

/// Control socket of a master connection
struct ControlSocket {
    path: PathBuf,
    dir: Option<TempDir>,
    destination: String,
    port: u16,
}

impl ControlSocket {
    /// Polls the control socket until the master accepts requests.
    ///
    /// Fails as soon as the master exits (bad credentials, unreachable
    /// host, rejected host key), reporting its stderr.
    async fn wait_until_ready(&self, master: &mut Child) -> MonitoringResult<()> {
        loop {
            if let Some(status) = master
                .try_wait()
                .map_err(|e| MonitoringError::Connect(format!("Failed to poll SSH process: {e}")))?
            {
                let stderr = read_stderr(master).await;
                return Err(MonitoringError::Connect(format!(
                    "SSH exited ({status}): {}",
                    stderr.trim()
                )));
            }

            let check = self.control_command("check").output().await;
            if matches!(check, Ok(ref output) if output.status.success()) {
                tracing::debug!(destination = %self.destination, "SSH master ready");
                return Ok(());
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// `ssh -O <operation>` against the control socket
    fn control_command(&self, operation: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg(format!("ControlPath={}", self.path.display()));
        cmd.arg("-p").arg(self.port.to_string());
        cmd.arg("-O").arg(operation);
        cmd.arg(&self.destination);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }

    /// Runs one remote command over the control socket
    fn exec_command(&self, command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg(format!("ControlPath={}", self.path.display()));
        cmd.arg("-o").arg("ControlMaster=no");
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-p").arg(self.port.to_string());
        cmd.arg(&self.destination);
        cmd.arg(command);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// One multiplexed SSH session, valid for a single collection cycle
pub struct SshSession {
    master: Child,
    socket: ControlSocket,
}

#[async_trait]
impl CommandRunner for SshSession {
    async fn run(&mut self, command: &str) -> MonitoringResult<RawCommandResult> {
        let output = self
            .socket
            .exec_command(command)
            .output()
            .await
            .map_err(|e| MonitoringError::Command(format!("Failed to spawn SSH process: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code();

        if exit_code == Some(SSH_ERROR_STATUS) {
            return Err(MonitoringError::Command(format!(
                "SSH command failed (exit {SSH_ERROR_STATUS}): {}",
                stderr.trim()
            )));
        }

        Ok(RawCommandResult {
            command: command.to_string(),
            stdout,
            stderr,
            exit_code,
        })
    }

    async fn close(mut self: Box<Self>) {
        let exit = self.socket.control_command("exit").status();
        if tokio::time::timeout(CLOSE_TIMEOUT, exit).await.is_err() {
            tracing::debug!(destination = %self.socket.destination, "ssh -O exit timed out");
        }
        if let Err(e) = self.master.kill().await {
            tracing::debug!(error = %e, "SSH master already gone");
        }
        if let Some(dir) = self.socket.dir.take()
            && let Err(e) = dir.close()
        {
            tracing::debug!(error = %e, "Failed to remove SSH control dir");
        }
        tracing::debug!(destination = %self.socket.destination, "SSH session closed");
    }
}

async fn read_stderr(child: &mut Child) -> String {
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr).await;
    }
    stderr
}
