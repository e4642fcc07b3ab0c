//! Construction-time settings for a managed server.

use std::env;
use std::fs::{File, OpenOptions};
use std::process::Stdio;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::ServerError;
use crate::observed::{DEFAULT_HOST, DEFAULT_PORT};

/// How long `stop` waits for a process it cannot reap to disappear.
pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_PID_FILE_NAME: &str = "portwarden-server.pid";

/// Destination for the spawned server's stdout and stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogSink {
    /// Share the calling process's stdout and stderr.
    #[default]
    Inherit,
    /// Discard all output.
    Null,
    /// Append to the file at this path, creating it when missing.
    File(Utf8PathBuf),
}

impl LogSink {
    /// Opens the sink as a stdout/stderr pair for a child process.
    pub(super) fn open(&self) -> Result<(Stdio, Stdio), ServerError> {
        match self {
            Self::Inherit => Ok((Stdio::inherit(), Stdio::inherit())),
            Self::Null => Ok((Stdio::null(), Stdio::null())),
            Self::File(path) => {
                let map_error = |source| ServerError::OpenLogSink {
                    path: path.clone(),
                    source,
                };
                let stdout = open_append(path).map_err(map_error)?;
                let stderr = stdout.try_clone().map_err(map_error)?;
                Ok((Stdio::from(stdout), Stdio::from(stderr)))
            }
        }
    }
}

fn open_append(path: &Utf8Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Settings for a [`super::ManagedServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedServerConfig {
    pub(super) executable: Utf8PathBuf,
    pub(super) build_path: Utf8PathBuf,
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) pid_file: Utf8PathBuf,
    pub(super) log_sink: LogSink,
    pub(super) exit_timeout: Duration,
}

impl ManagedServerConfig {
    /// Creates settings for serving `build_path` with the binary at
    /// `executable`, using the default port, pid file, and log sink.
    pub fn new(executable: impl Into<Utf8PathBuf>, build_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            build_path: build_path.into(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            pid_file: default_pid_file(),
            log_sink: LogSink::default(),
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the host probed by readiness checks. The server itself is not
    /// told about it.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_pid_file(mut self, pid_file: impl Into<Utf8PathBuf>) -> Self {
        self.pid_file = pid_file.into();
        self
    }

    #[must_use]
    pub fn with_log_sink(mut self, log_sink: LogSink) -> Self {
        self.log_sink = log_sink;
        self
    }

    #[must_use]
    pub fn with_exit_timeout(mut self, exit_timeout: Duration) -> Self {
        self.exit_timeout = exit_timeout;
        self
    }

    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }

    pub fn build_path(&self) -> &Utf8Path {
        &self.build_path
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn pid_file(&self) -> &Utf8Path {
        &self.pid_file
    }

    pub const fn log_sink(&self) -> &LogSink {
        &self.log_sink
    }

    pub const fn exit_timeout(&self) -> Duration {
        self.exit_timeout
    }
}

fn default_pid_file() -> Utf8PathBuf {
    let base = Utf8PathBuf::from_path_buf(env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
    base.join(DEFAULT_PID_FILE_NAME)
}
