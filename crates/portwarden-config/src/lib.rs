//! Layered configuration for the `portwarden` command.
//!
//! Values merge from built-in defaults, an optional TOML file
//! (`--config-path` or `PORTWARDEN_CONFIG_PATH`), `PORTWARDEN_*` environment
//! variables, and CLI flags, in increasing order of precedence. Every field
//! is optional so that an unset layer never masks a lower one. The address
//! and log filter carry declared defaults, which also keeps the defaults layer
//! non-empty when nothing else is configured; the accessor methods cover the
//! remaining fields.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use portwarden::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_START_TIMEOUT, DEFAULT_STOP_TIMEOUT};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BUILD_PATH, DEFAULT_LOG_FILTER, DEFAULT_SERVER_NAME, default_log_filter,
    default_log_format, default_pid_file,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Settings shared by every `portwarden` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PORTWARDEN")]
pub struct Config {
    /// Build output directory served by the managed server.
    pub build_path: Option<Utf8PathBuf>,
    /// Explicit server binary; skips the PATH and `node_modules` search.
    pub server_bin: Option<Utf8PathBuf>,
    /// Where the managed server PID is recorded.
    pub pid_file: Option<Utf8PathBuf>,
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: Option<u16>,
    #[ortho_config(default = String::from(DEFAULT_HOST))]
    pub host: Option<String>,
    /// Appends server output to this file instead of the terminal.
    pub log_file: Option<Utf8PathBuf>,
    pub start_timeout_secs: Option<u64>,
    pub stop_timeout_secs: Option<u64>,
    /// `tracing` filter directives for the command's own logs.
    #[ortho_config(default = String::from(DEFAULT_LOG_FILTER))]
    pub log_filter: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl Config {
    pub fn build_path(&self) -> Utf8PathBuf {
        self.build_path
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_BUILD_PATH))
    }

    pub fn server_bin(&self) -> Option<&Utf8Path> {
        self.server_bin.as_deref()
    }

    pub fn pid_file(&self) -> Utf8PathBuf {
        self.pid_file.clone().unwrap_or_else(default_pid_file)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn log_file(&self) -> Option<&Utf8Path> {
        self.log_file.as_deref()
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout_secs
            .map_or(DEFAULT_START_TIMEOUT, Duration::from_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout_secs
            .map_or(DEFAULT_STOP_TIMEOUT, Duration::from_secs)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}
