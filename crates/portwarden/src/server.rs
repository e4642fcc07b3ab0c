//! The lifecycle contract shared by observed and managed servers.

use crate::ServerError;

/// Start/stop contract consumed by test harnesses and [`crate::ServerGuard`].
///
/// Observed servers answer the liveness queries with live port probes, while
/// managed servers answer from their in-memory state.
pub trait Server {
    /// Brings the server up, returning `Ok(false)` when it was already up.
    fn start(&mut self) -> Result<bool, ServerError>;

    /// Brings the server down, returning `Ok(false)` when there was nothing to
    /// stop.
    fn stop(&mut self) -> Result<bool, ServerError>;

    fn is_started(&self) -> Result<bool, ServerError>;

    fn is_stopped(&self) -> Result<bool, ServerError>;
}
