//! Servers that run outside this process's control.
//!
//! An [`ObservedServer`] wraps a process someone else started, for example a
//! dev server left running in another terminal. It never spawns or signals
//! anything; `start` and `stop` only wait for the port to reach the expected
//! state and fail when it does not.

use std::time::Duration;

use tracing::info;

use crate::port::PortWaiter;
use crate::{Server, ServerError};

/// Host probed when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Port probed when none is configured.
pub const DEFAULT_PORT: u16 = 5001;
/// How long `start` waits for a listener by default.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(60);
/// How long `stop` waits for the listener to go away by default.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// An externally managed server identified only by its port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedServer {
    waiter: PortWaiter,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl Default for ObservedServer {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl ObservedServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            waiter: PortWaiter::new(host, port),
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Sets how long `start` and `is_started` wait for a listener.
    #[must_use]
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Sets how long `stop` and `is_stopped` wait for the listener to go away.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.waiter = self.waiter.with_poll_interval(poll_interval);
        self
    }

    pub fn host(&self) -> &str {
        self.waiter.host()
    }

    pub const fn port(&self) -> u16 {
        self.waiter.port()
    }

    pub const fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Waits for the external process to accept connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotFoundOnPort`] when nothing listens within the
    /// start timeout, or [`ServerError::Probe`] for non-transient probe
    /// failures.
    pub fn start(&self) -> Result<(), ServerError> {
        if !self.waiter.wait_until_open(self.start_timeout)? {
            return Err(ServerError::NotFoundOnPort {
                host: self.host().to_owned(),
                port: self.port(),
                timeout: self.start_timeout,
            });
        }
        info!(host = %self.host(), port = self.port(), "external server is listening");
        Ok(())
    }

    /// Reports whether something accepts connections within the start timeout.
    pub fn is_started(&self) -> Result<bool, ServerError> {
        self.waiter.wait_until_open(self.start_timeout)
    }

    /// Waits for the external process to stop accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StillRunning`] when the port is still open after
    /// the stop timeout, or [`ServerError::Probe`] for non-transient probe
    /// failures.
    pub fn stop(&self) -> Result<(), ServerError> {
        if !self.waiter.wait_until_closed(self.stop_timeout)? {
            return Err(ServerError::StillRunning {
                host: self.host().to_owned(),
                port: self.port(),
                timeout: self.stop_timeout,
            });
        }
        info!(host = %self.host(), port = self.port(), "external server stopped listening");
        Ok(())
    }

    /// Reports whether the port stops accepting connections within the stop
    /// timeout.
    pub fn is_stopped(&self) -> Result<bool, ServerError> {
        self.waiter.wait_until_closed(self.stop_timeout)
    }
}

impl Server for ObservedServer {
    fn start(&mut self) -> Result<bool, ServerError> {
        Self::start(self).map(|()| true)
    }

    fn stop(&mut self) -> Result<bool, ServerError> {
        Self::stop(self).map(|()| true)
    }

    fn is_started(&self) -> Result<bool, ServerError> {
        Self::is_started(self)
    }

    fn is_stopped(&self) -> Result<bool, ServerError> {
        Self::is_stopped(self)
    }
}
