//! Server process spawning.
//!
//! The binary is executed directly rather than through a shell so the PID we
//! record belongs to the server itself and not to a wrapper that forks it.

use std::io;
use std::path::absolute;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::ManagedServerConfig;
use crate::ServerError;

const BUSY_ATTEMPTS: u32 = 5;
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

/// Spawns `<executable> -p <port> --path <basename>` from the parent of the
/// build directory.
pub(super) fn spawn_server(config: &ManagedServerConfig) -> Result<Child, ServerError> {
    let binary = resolve_binary(&config.executable);
    let (working_dir, target) = launch_location(&config.build_path);
    let (stdout, stderr) = config.log_sink.open()?;

    let mut command = Command::new(binary.as_std_path());
    command
        .args(server_arguments(config.port, &target))
        .current_dir(working_dir.as_std_path())
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    detach(&mut command);

    debug!(
        %binary,
        port = config.port,
        %working_dir,
        %target,
        "spawning server process"
    );
    retry_while_busy(|| command.spawn())
        .map_err(|source| ServerError::Spawn { binary, source })
}

/// Retries `spawn` while the binary is still open for writing somewhere
/// (`ETXTBSY`), as happens just after it was installed or written.
fn retry_while_busy<T>(mut spawn: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 1;
    loop {
        match spawn() {
            Err(error)
                if error.kind() == io::ErrorKind::ExecutableFileBusy && attempt < BUSY_ATTEMPTS =>
            {
                debug!(attempt, "server binary busy; retrying spawn");
                thread::sleep(BUSY_BACKOFF * attempt);
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn server_arguments(port: u16, target: &str) -> [String; 4] {
    [
        String::from("-p"),
        port.to_string(),
        String::from("--path"),
        target.to_owned(),
    ]
}

/// Anchors a relative binary path before the working directory changes.
fn resolve_binary(executable: &Utf8Path) -> Utf8PathBuf {
    if executable.is_absolute() {
        return executable.to_path_buf();
    }
    absolute(executable)
        .ok()
        .and_then(|expanded| Utf8PathBuf::from_path_buf(expanded).ok())
        .unwrap_or_else(|| executable.to_path_buf())
}

/// Splits the build path into the directory to run from and the name the
/// server should serve.
fn launch_location(build_path: &Utf8Path) -> (Utf8PathBuf, String) {
    match build_path.file_name() {
        Some(name) => {
            let parent = build_path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            (parent.to_path_buf(), name.to_owned())
        }
        None => (build_path.to_path_buf(), String::from(".")),
    }
}

/// Moves the server into its own process group so terminal job control
/// signals aimed at the caller do not reach it.
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}
