//! Checks that must pass before a server process is spawned.

use std::fs::{self, Metadata};
use std::io;
use std::path::absolute;

use camino::{Utf8Path, Utf8PathBuf};

use super::ManagedServerConfig;
use crate::ServerError;

/// Verifies the server binary and the build output directory.
pub(super) fn check_requirements(config: &ManagedServerConfig) -> Result<(), ServerError> {
    check_executable(&config.executable)?;
    check_build_path(&config.build_path)
}

fn check_executable(path: &Utf8Path) -> Result<(), ServerError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(ServerError::ExecutableNotFound {
                name: path.file_name().unwrap_or(path.as_str()).to_owned(),
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ServerError::InspectPath {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !is_executable(&metadata) {
        return Err(ServerError::ExecutableNotExecutable {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &Metadata) -> bool {
    metadata.is_file()
}

fn check_build_path(path: &Utf8Path) -> Result<(), ServerError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ServerError::TargetNotFound {
            path: display_path(path),
        }),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            Err(ServerError::TargetNotFound {
                path: display_path(path),
            })
        }
        Err(source) => Err(ServerError::InspectPath {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Expands `path` against the working directory for error messages.
fn display_path(path: &Utf8Path) -> Utf8PathBuf {
    absolute(path)
        .ok()
        .and_then(|expanded| Utf8PathBuf::from_path_buf(expanded).ok())
        .unwrap_or_else(|| path.to_path_buf())
}
