//! Server termination: signal, then reap.
//!
//! A process that has already exited is a successful stop, whether the kernel
//! reports it at signal time (`ESRCH`) or at reap time (`ECHILD`). `ECHILD` also
//! covers servers started by another process, which cannot be reaped here; for
//! those the exit is observed by polling instead.

use std::time::Duration;

use crate::ServerError;

#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::thread;
#[cfg(unix)]
use std::time::Instant;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, kill};
#[cfg(unix)]
use nix::sys::wait::waitpid;
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tracing::{debug, warn};

#[cfg(unix)]
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sends SIGTERM to `pid` and waits for it to exit.
///
/// # Errors
///
/// Returns [`ServerError::InvalidPid`] for PIDs that would address a process
/// group, [`ServerError::Signal`] when delivery fails for any reason other
/// than the process being gone, and [`ServerError::Reap`] when waiting fails
/// for any reason other than the process not being our child.
pub(super) fn terminate(pid: u32, exit_timeout: Duration) -> Result<(), ServerError> {
    #[cfg(unix)]
    {
        let target = to_nix_pid(pid)?;
        match kill(target, Signal::SIGTERM) {
            Ok(()) => debug!(pid, "sent SIGTERM"),
            Err(Errno::ESRCH) => {
                debug!(pid, "process already exited");
                return Ok(());
            }
            Err(errno) => {
                return Err(ServerError::Signal {
                    pid,
                    source: io::Error::from(errno),
                });
            }
        }
        reap(target, pid, exit_timeout)
    }
    #[cfg(not(unix))]
    {
        let _ = (pid, exit_timeout);
        Err(ServerError::UnsupportedPlatform)
    }
}

/// Reports whether a process with `pid` exists, without signalling it.
///
/// A process owned by another user still counts (`EPERM`).
pub(super) fn is_alive(pid: u32) -> Result<bool, ServerError> {
    #[cfg(unix)]
    {
        match kill(to_nix_pid(pid)?, None) {
            Ok(()) | Err(Errno::EPERM) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(errno) => Err(ServerError::Signal {
                pid,
                source: io::Error::from(errno),
            }),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(ServerError::UnsupportedPlatform)
    }
}

#[cfg(unix)]
fn to_nix_pid(pid: u32) -> Result<Pid, ServerError> {
    if pid == 0 {
        return Err(ServerError::InvalidPid {
            pid,
            reason: "pid 0 addresses the caller's process group",
        });
    }
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| ServerError::InvalidPid {
            pid,
            reason: "pid exceeds the platform pid range",
        })
}

#[cfg(unix)]
fn reap(target: Pid, pid: u32, exit_timeout: Duration) -> Result<(), ServerError> {
    loop {
        match waitpid(target, None) {
            Ok(status) => {
                debug!(pid, ?status, "reaped server process");
                return Ok(());
            }
            Err(Errno::EINTR) => {}
            Err(Errno::ECHILD) => {
                debug!(pid, "not our child; waiting for it to exit");
                wait_for_exit(target, pid, exit_timeout);
                return Ok(());
            }
            Err(errno) => {
                return Err(ServerError::Reap {
                    pid,
                    source: io::Error::from(errno),
                });
            }
        }
    }
}

/// Polls until `target` disappears or `exit_timeout` passes. A timeout too
/// large to express as a deadline polls without one.
#[cfg(unix)]
fn wait_for_exit(target: Pid, pid: u32, exit_timeout: Duration) {
    let deadline = Instant::now().checked_add(exit_timeout);
    while deadline.is_none_or(|deadline| Instant::now() < deadline) {
        if matches!(kill(target, None), Err(Errno::ESRCH)) {
            return;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
    warn!(pid, ?exit_timeout, "server process still alive after SIGTERM");
}
