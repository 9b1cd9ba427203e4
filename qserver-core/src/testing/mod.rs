//! In-memory stand-in for a monitored host
//!
//! [`ScriptedHost`] implements [`Transport`] with canned command replies so
//! the collection cycle and scheduler can be exercised without a network.
//! It also counts opened and released sessions, which lets callers check
//! that no session outlives its cycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::ConnectionConfig;
use crate::monitoring::{
    CPU_COMMAND, CommandRunner, KERNEL_COMMAND, MEMORY_COMMAND, MonitoringError,
    MonitoringResult, OS_RELEASE_COMMAND, RawCommandResult, STORAGE_COMMAND, Transport,
    UPTIME_COMMAND, service_status_command,
};

/// Sample `free -m` output
pub const FREE_OUTPUT: &str = "\
               total        used        free      shared  buff/cache   available
Mem:            7951        3200        1200         150        3551        4400
Swap:           2047           0        2047
";

/// Sample `top -bn1 | grep '%Cpu(s)'` output
pub const TOP_OUTPUT: &str =
    "%Cpu(s):  12.5 us,  3.1 sy,  0.0 ni, 83.9 id,  0.3 wa,  0.0 hi,  0.2 si,  0.0 st\n";

/// Sample `df -h --total | grep total` output
pub const DF_OUTPUT: &str = "total           200G   50G  150G  25% -\n";

/// Sample os-release line
pub const OS_RELEASE_OUTPUT: &str = "PRETTY_NAME=\"Ubuntu 24.04.1 LTS\"\n";

/// Sample `uname -r` output
pub const KERNEL_OUTPUT: &str = "6.8.0-45-generic\n";

/// Sample `uptime -p` output
pub const UPTIME_OUTPUT: &str = "up 3 days, 4 hours, 12 minutes\n";

/// How the scripted host answers one command
#[derive(Debug, Clone)]
pub enum Reply {
    /// Print `stdout` and exit with `exit_code`
    Output {
        /// Captured standard output
        stdout: String,
        /// Remote exit status
        exit_code: i32,
    },
    /// Never answer
    Hang,
    /// Answer after a delay
    Delayed(Duration, Box<Reply>),
    /// Fail to dispatch the command
    DispatchError(String),
}

impl Reply {
    /// Successful reply printing `stdout`
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::Output {
            stdout: stdout.into(),
            exit_code: 0,
        }
    }

    /// Reply printing `stdout` with a non-zero exit status
    #[must_use]
    pub fn exit(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self::Output {
            stdout: stdout.into(),
            exit_code,
        }
    }
}

/// How the scripted host answers a connection attempt
#[derive(Debug, Clone, Default)]
enum ConnectBehavior {
    #[default]
    Accept,
    Refuse(String),
    Hang,
}

#[derive(Debug, Default)]
struct HostState {
    replies: Mutex<HashMap<String, Reply>>,
    connect: Mutex<ConnectBehavior>,
    commands: Mutex<Vec<String>>,
    sessions_opened: AtomicUsize,
    sessions_released: AtomicUsize,
}

/// Scripted host; clones share state
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    state: Arc<HostState>,
}

impl ScriptedHost {
    /// Host with no scripted replies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host answering every probe with realistic output.
    ///
    /// `services` pairs each service name with its `systemctl is-active`
    /// output.
    #[must_use]
    pub fn healthy(services: &[(&str, &str)]) -> Self {
        let host = Self::new()
            .with_reply(MEMORY_COMMAND, Reply::ok(FREE_OUTPUT))
            .with_reply(CPU_COMMAND, Reply::ok(TOP_OUTPUT))
            .with_reply(STORAGE_COMMAND, Reply::ok(DF_OUTPUT))
            .with_reply(OS_RELEASE_COMMAND, Reply::ok(OS_RELEASE_OUTPUT))
            .with_reply(KERNEL_COMMAND, Reply::ok(KERNEL_OUTPUT))
            .with_reply(UPTIME_COMMAND, Reply::ok(UPTIME_OUTPUT));

        services.iter().fold(host, |host, (name, status)| {
            // systemctl exits 3 for inactive units but still prints the state
            let exit_code = if *status == "active" { 0 } else { 3 };
            host.with_reply(
                service_status_command(name),
                Reply::exit(format!("{status}\n"), exit_code),
            )
        })
    }

    /// Sets the reply for `command`
    #[must_use]
    pub fn with_reply(self, command: impl Into<String>, reply: Reply) -> Self {
        self.set_reply(command, reply);
        self
    }

    /// Replaces the reply for `command` on a shared host
    pub fn set_reply(&self, command: impl Into<String>, reply: Reply) {
        lock(&self.state.replies).insert(command.into(), reply);
    }

    /// Makes every connection attempt fail with `reason`
    #[must_use]
    pub fn refusing(self, reason: impl Into<String>) -> Self {
        *lock(&self.state.connect) = ConnectBehavior::Refuse(reason.into());
        self
    }

    /// Makes every connection attempt hang
    #[must_use]
    pub fn unresponsive(self) -> Self {
        *lock(&self.state.connect) = ConnectBehavior::Hang;
        self
    }

    /// Commands received so far, in order
    #[must_use]
    pub fn commands_run(&self) -> Vec<String> {
        lock(&self.state.commands).clone()
    }

    /// Number of sessions opened
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed or dropped
    #[must_use]
    pub fn sessions_released(&self) -> usize {
        self.state.sessions_released.load(Ordering::SeqCst)
    }

    /// Number of sessions currently open
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened().saturating_sub(self.sessions_released())
    }
}

#[async_trait]
impl Transport for ScriptedHost {
    async fn open(&self, _config: &ConnectionConfig) -> MonitoringResult<Box<dyn CommandRunner>> {
        let behavior = lock(&self.state.connect).clone();
        match behavior {
            ConnectBehavior::Accept => {}
            ConnectBehavior::Refuse(reason) => return Err(MonitoringError::Connect(reason)),
            ConnectBehavior::Hang => return std::future::pending().await,
        }

        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

struct ScriptedSession {
    state: Arc<HostState>,
    released: bool,
}

impl ScriptedSession {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.sessions_released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedSession {
    async fn run(&mut self, command: &str) -> MonitoringResult<RawCommandResult> {
        lock(&self.state.commands).push(command.to_string());

        let mut reply = lock(&self.state.replies).get(command).cloned();
        loop {
            match reply {
                Some(Reply::Output { stdout, exit_code }) => {
                    return Ok(RawCommandResult {
                        command: command.to_string(),
                        stdout,
                        stderr: String::new(),
                        exit_code: Some(exit_code),
                    });
                }
                Some(Reply::Delayed(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    reply = Some(*inner);
                }
                Some(Reply::Hang) => return std::future::pending().await,
                Some(Reply::DispatchError(reason)) => {
                    return Err(MonitoringError::Command(reason));
                }
                None => {
                    return Ok(RawCommandResult {
                        command: command.to_string(),
                        stdout: String::new(),
                        stderr: format!("sh: 1: {command}: not found\n"),
                        exit_code: Some(127),
                    });
                }
            }
        }
    }

    async fn close(mut self: Box<Self>) {
        self.release();
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
