use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;

/// Name of the server binary searched for when none is configured.
pub const DEFAULT_SERVER_NAME: &str = "angular-http-server";

/// Build output directory served when none is configured.
pub const DEFAULT_BUILD_PATH: &str = "dist";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

const PID_FILE_NAME: &str = "server.pid";

pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the PID file location used when none is configured.
///
/// Prefers the per-user runtime directory. The shared temporary directory is
/// namespaced by effective UID so users on one host do not collide.
pub fn default_pid_file() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("portwarden");
    if apply_namespace && let Some(namespace) = user_namespace() {
        base.push(namespace);
    }
    base.join(PID_FILE_NAME)
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> Option<String> {
    let uid = unsafe { geteuid() };
    Some(format!("uid-{uid}"))
}

#[cfg(not(unix))]
fn user_namespace() -> Option<String> {
    None
}
