//! TCP port liveness probing.
//!
//! A probe is a bare connect attempt; nothing is written to the socket and the
//! stream is dropped as soon as the handshake completes. Only "nobody is
//! listening yet" outcomes are retried while waiting. Any other connect error
//! is handed back to the caller.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::ServerError;

/// Delay between probe attempts while waiting on a port.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_CONNECT_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Open,
    Closed,
}

/// Polls a `host:port` pair until it starts or stops accepting connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortWaiter {
    host: String,
    port: u16,
    poll_interval: Duration,
}

impl PortWaiter {
    /// Creates a waiter for `host:port` using [`DEFAULT_POLL_INTERVAL`].
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the delay between probe attempts.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Runs a single probe and reports whether something accepted the
    /// connection.
    pub fn is_open(&self) -> Result<bool, ServerError> {
        self.probe(MAX_CONNECT_TIMEOUT)
            .map(|liveness| liveness == Liveness::Open)
            .map_err(|source| self.probe_error(source))
    }

    /// Waits up to `timeout` for the port to accept a connection.
    ///
    /// Returns `Ok(false)` when the deadline passes without a listener. The
    /// elapsed time in that case is never shorter than `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Probe`] when a connect attempt fails for any
    /// reason other than a refused or unreachable host, including address
    /// resolution failures.
    pub fn wait_until_open(&self, timeout: Duration) -> Result<bool, ServerError> {
        self.wait_for(Liveness::Open, timeout)
    }

    /// Waits up to `timeout` for the port to stop accepting connections.
    ///
    /// The first probe that finds nobody listening returns `Ok(true)`;
    /// `Ok(false)` means the port was still open when the deadline passed.
    ///
    /// # Errors
    ///
    /// Same as [`PortWaiter::wait_until_open`].
    pub fn wait_until_closed(&self, timeout: Duration) -> Result<bool, ServerError> {
        self.wait_for(Liveness::Closed, timeout)
    }

    fn wait_for(&self, wanted: Liveness, timeout: Duration) -> Result<bool, ServerError> {
        // A timeout past the clock's range waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let remaining = || {
            deadline.map_or(Duration::MAX, |at| {
                at.saturating_duration_since(Instant::now())
            })
        };
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let connect_timeout = remaining().clamp(MIN_CONNECT_TIMEOUT, MAX_CONNECT_TIMEOUT);
            let liveness = match self.probe(connect_timeout) {
                Ok(liveness) => liveness,
                // The connect attempt used up what was left of the deadline.
                Err(error) if error.kind() == io::ErrorKind::TimedOut && remaining().is_zero() => {
                    Liveness::Closed
                }
                Err(source) => return Err(self.probe_error(source)),
            };
            if liveness == wanted {
                debug!(
                    host = %self.host,
                    port = self.port,
                    ?liveness,
                    attempts,
                    "port reached expected state"
                );
                return Ok(true);
            }

            let left = remaining();
            if left.is_zero() {
                debug!(
                    host = %self.host,
                    port = self.port,
                    ?liveness,
                    attempts,
                    ?timeout,
                    "gave up waiting for port"
                );
                return Ok(false);
            }
            thread::sleep(self.poll_interval.min(left));
        }
    }

    fn probe(&self, connect_timeout: Duration) -> io::Result<Liveness> {
        let addresses = self.resolve()?;
        settle(addresses.iter().map(|address| {
            TcpStream::connect_timeout(address, connect_timeout)
                .map(drop)
                .inspect_err(|error| debug!(%address, %error, "connect attempt failed"))
        }))
    }

    fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addresses: Vec<SocketAddr> =
            (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        if addresses.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved address",
            ));
        }
        Ok(addresses)
    }

    fn probe_error(&self, source: io::Error) -> ServerError {
        ServerError::Probe {
            host: self.host.clone(),
            port: self.port,
            source,
        }
    }
}

/// Folds the connect attempts for every resolved address into one verdict.
///
/// The first successful connect means open. Otherwise the port is closed if
/// any address reported nobody listening, and the last error is returned only
/// when every address failed for some other reason.
fn settle(attempts: impl Iterator<Item = io::Result<()>>) -> io::Result<Liveness> {
    let mut answered = false;
    let mut failure = None;
    for attempt in attempts {
        match attempt {
            Ok(()) => return Ok(Liveness::Open),
            Err(error) if is_not_listening(&error) => answered = true,
            Err(error) => failure = Some(error),
        }
    }
    match failure {
        Some(error) if !answered => Err(error),
        _ => Ok(Liveness::Closed),
    }
}

/// Determines whether a connect error means nobody is listening yet.
///
/// The unreachable and unavailable kinds are included because `localhost`
/// commonly resolves to an IPv6 loopback that the host may not be able to
/// route.
fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable
    )
}
