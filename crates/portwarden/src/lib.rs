//! Lifecycle control for static HTTP servers used by end-to-end tests.
//!
//! Two kinds of server are supported. An [`ObservedServer`] is started by
//! someone else and is only watched through its TCP port. A [`ManagedServer`]
//! is spawned here from a configured binary, tracked through a PID file, and
//! terminated with SIGTERM. Both implement [`Server`], so a test harness can
//! hold either behind a [`ServerGuard`] that stops it when the scope ends.

mod error;
mod guard;
mod locator;
mod managed;
mod observed;
mod port;
mod server;

pub use error::ServerError;
pub use guard::ServerGuard;
pub use locator::{
    DEFAULT_RELATIVE_DIR, ExecutableLocator, FixedLocator, LocatorError, SearchLocator,
    find_in_ancestors,
};
pub use managed::{DEFAULT_EXIT_TIMEOUT, LogSink, ManagedServer, ManagedServerConfig, ServerState};
pub use observed::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_START_TIMEOUT, DEFAULT_STOP_TIMEOUT, ObservedServer,
};
pub use port::{DEFAULT_POLL_INTERVAL, PortWaiter};
pub use server::Server;

#[cfg(test)]
mod tests;
