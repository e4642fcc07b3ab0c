//! Error types for server lifecycle operations.

use std::io;
use std::num::ParseIntError;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while starting, stopping, or probing a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Nothing accepted connections on the port before the start timeout.
    #[error(
        "tried for {timeout:?} but nothing was listening on {host}:{port}; make sure the server process is running and that the port is correct"
    )]
    NotFoundOnPort {
        host: String,
        port: u16,
        timeout: Duration,
    },
    /// The port kept accepting connections past the stop timeout.
    #[error(
        "tried for {timeout:?} to verify that the process listening on {host}:{port} had stopped, but it is still accepting connections; it may be a zombie process or the stop timeout may need increasing"
    )]
    StillRunning {
        host: String,
        port: u16,
        timeout: Duration,
    },
    /// The configured server binary does not exist.
    #[error(
        "{name} not found at {path}! Make sure it is installed, either in the project with `npm install --save-dev {name}` or globally with `npm install -g {name}`"
    )]
    ExecutableNotFound { name: String, path: Utf8PathBuf },
    /// The configured server binary exists but cannot be executed.
    #[error("{path} was found but is not executable; fix its permissions (e.g. `chmod +x {path}`)")]
    ExecutableNotExecutable { path: Utf8PathBuf },
    /// The build output directory served by the process is missing.
    #[error(
        "{path} directory not found! Make sure the app is built before starting the server, e.g. `ng build --output-path={path}`"
    )]
    TargetNotFound { path: Utf8PathBuf },
    #[error("failed to inspect {path}: {source}")]
    InspectPath {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to probe {host}:{port}: {source}")]
    Probe {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("failed to open server log {path}: {source}")]
    OpenLogSink {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn server binary {binary}: {source}")]
    Spawn {
        binary: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write pid file {path}: {source}")]
    WritePid {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read pid file {path}: {source}")]
    ReadPid {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse pid file {path}: {source}")]
    ParsePid {
        path: Utf8PathBuf,
        #[source]
        source: ParseIntError,
    },
    #[error("pid {pid} cannot be signalled: {reason}")]
    InvalidPid { pid: u32, reason: &'static str },
    #[error("failed to remove pid file {path}: {source}")]
    RemovePid {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to signal server pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to reap server pid {pid}: {source}")]
    Reap {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[cfg(not(unix))]
    #[error("platform does not support server process signalling")]
    UnsupportedPlatform,
}
