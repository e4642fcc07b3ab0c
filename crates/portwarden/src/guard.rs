//! Scope-bound server lifetimes.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::{Server, ServerError};

/// Keeps a server running for as long as the guard is alive.
///
/// The server is stopped when the guard drops, including on early returns
/// and unwinding. Failures during that implicit stop are logged rather than
/// raised; call [`ServerGuard::release`] to observe them.
#[derive(Debug)]
pub struct ServerGuard<S: Server> {
    server: S,
    armed: bool,
}

impl<S: Server> ServerGuard<S> {
    /// Starts `server` and arms the guard.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`Server::start`]; nothing is armed in that
    /// case.
    pub fn acquire(mut server: S) -> Result<Self, ServerError> {
        server.start()?;
        Ok(Self {
            server,
            armed: true,
        })
    }

    /// Stops the server now and hands it back.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`Server::stop`]. The guard is disarmed
    /// either way.
    pub fn release(mut self) -> Result<bool, ServerError> {
        self.armed = false;
        self.server.stop()
    }
}

impl<S: Server> Deref for ServerGuard<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

impl<S: Server> DerefMut for ServerGuard<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.server
    }
}

impl<S: Server> Drop for ServerGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.server.stop() {
            Ok(stopped) => debug!(stopped, "guard stopped server"),
            Err(error) => warn!(%error, "failed to stop server on guard drop"),
        }
    }
}
