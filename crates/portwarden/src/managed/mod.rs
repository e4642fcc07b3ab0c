//! Servers whose process this crate spawns and terminates.
//!
//! A [`ManagedServer`] launches an `angular-http-server` style binary against
//! a build output directory, records its PID on disk, and stops it again with
//! SIGTERM. The PID file is the ownership claim: `stop` acts on whatever PID
//! it names, even when this instance never started anything.

mod config;
mod pid_file;
mod preconditions;
mod shutdown;
mod spawning;

use std::fmt;
use std::process::Child;
use std::time::Duration;

use tracing::{info, warn};

pub use self::config::{DEFAULT_EXIT_TIMEOUT, LogSink, ManagedServerConfig};
use self::pid_file::{read_pid, remove_pid, write_pid};
use self::preconditions::check_requirements;
use self::shutdown::{is_alive, terminate};
use self::spawning::spawn_server;
use crate::port::PortWaiter;
use crate::{Server, ServerError};

/// Lifecycle position of a [`ManagedServer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerState {
    #[default]
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// A server process spawned and owned by this crate.
#[derive(Debug)]
pub struct ManagedServer {
    config: ManagedServerConfig,
    waiter: PortWaiter,
    state: ServerState,
    pid: Option<u32>,
}

impl ManagedServer {
    pub fn new(config: ManagedServerConfig) -> Self {
        let waiter = PortWaiter::new(config.host(), config.port());
        Self {
            config,
            waiter,
            state: ServerState::NotStarted,
            pid: None,
        }
    }

    /// Overrides the delay between readiness probes.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.waiter = self.waiter.with_poll_interval(poll_interval);
        self
    }

    pub const fn config(&self) -> &ManagedServerConfig {
        &self.config
    }

    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// PID of the process this instance spawned, if it is running.
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// PID currently recorded in the PID file, whoever wrote it.
    pub fn recorded_pid(&self) -> Result<Option<u32>, ServerError> {
        read_pid(self.config.pid_file())
    }

    /// PID recorded in the PID file when that process still exists.
    ///
    /// A stale PID file, left behind by a server that exited without being
    /// stopped, yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the [`ManagedServer::recorded_pid`] errors, plus
    /// [`ServerError::InvalidPid`] or [`ServerError::Signal`] when the
    /// recorded PID cannot be checked.
    pub fn running_pid(&self) -> Result<Option<u32>, ServerError> {
        match self.recorded_pid()? {
            Some(pid) if is_alive(pid)? => Ok(Some(pid)),
            _ => Ok(None),
        }
    }

    /// Spawns the server and records its PID.
    ///
    /// Returns `Ok(false)` without doing anything when this instance already
    /// started a server. The process may still be binding its port when this
    /// returns; use [`ManagedServer::wait_until_ready`] to wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ExecutableNotFound`],
    /// [`ServerError::ExecutableNotExecutable`], or
    /// [`ServerError::TargetNotFound`] when the preconditions fail, and the
    /// OS-level variants when spawning or writing the PID file fails. The
    /// state is left as it was before the call.
    pub fn start(&mut self) -> Result<bool, ServerError> {
        if self.is_started() {
            return Ok(false);
        }
        let previous = self.state;
        self.state = ServerState::Starting;
        match self.launch() {
            Ok(pid) => {
                self.pid = Some(pid);
                self.state = ServerState::Running;
                info!(
                    pid,
                    port = self.config.port(),
                    build_path = %self.config.build_path(),
                    "server started"
                );
                Ok(true)
            }
            Err(error) => {
                self.state = previous;
                Err(error)
            }
        }
    }

    fn launch(&self) -> Result<u32, ServerError> {
        check_requirements(&self.config)?;
        let mut child = spawn_server(&self.config)?;
        let pid = child.id();
        if let Err(error) = write_pid(self.config.pid_file(), pid) {
            discard_child(&mut child);
            return Err(error);
        }
        Ok(pid)
    }

    /// Terminates the process named in the PID file and removes the file.
    ///
    /// Returns `Ok(false)` when there is no PID file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ReadPid`], [`ServerError::ParsePid`], or
    /// [`ServerError::InvalidPid`] when the PID file cannot be used, and
    /// [`ServerError::Signal`] or [`ServerError::Reap`] when termination
    /// fails for a process that still exists.
    pub fn stop(&mut self) -> Result<bool, ServerError> {
        let Some(pid) = read_pid(self.config.pid_file())? else {
            return Ok(false);
        };
        let previous = self.state;
        self.state = ServerState::Stopping;
        if let Err(error) = terminate(pid, self.config.exit_timeout()) {
            self.state = previous;
            return Err(error);
        }
        self.state = ServerState::Stopped;
        self.pid = None;
        remove_pid(self.config.pid_file())?;
        info!(pid, "server stopped");
        Ok(true)
    }

    /// Reports whether this instance started a server that it has not yet
    /// stopped. No probe is made.
    pub fn is_started(&self) -> bool {
        self.state == ServerState::Running
    }

    /// Reports whether this instance holds no running server. No probe is made.
    pub fn is_stopped(&self) -> bool {
        !self.is_started()
    }

    /// Waits up to `timeout` for the server port to accept connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotFoundOnPort`] when the port stays closed, or
    /// [`ServerError::Probe`] for non-transient probe failures.
    pub fn wait_until_ready(&self, timeout: Duration) -> Result<(), ServerError> {
        if self.waiter.wait_until_open(timeout)? {
            return Ok(());
        }
        Err(ServerError::NotFoundOnPort {
            host: self.config.host().to_owned(),
            port: self.config.port(),
            timeout,
        })
    }
}

/// Kills a child we could not record, so it does not outlive the error.
fn discard_child(child: &mut Child) {
    let pid = child.id();
    if let Err(error) = child.kill() {
        warn!(pid, %error, "failed to kill unrecorded server process");
    }
    if let Err(error) = child.wait() {
        warn!(pid, %error, "failed to reap unrecorded server process");
    }
}

impl Server for ManagedServer {
    fn start(&mut self) -> Result<bool, ServerError> {
        Self::start(self)
    }

    fn stop(&mut self) -> Result<bool, ServerError> {
        Self::stop(self)
    }

    fn is_started(&self) -> Result<bool, ServerError> {
        Ok(Self::is_started(self))
    }

    fn is_stopped(&self) -> Result<bool, ServerError> {
        Ok(Self::is_stopped(self))
    }
}
