//! PID file I/O.
//!
//! The file holds the decimal PID of the managed server and nothing else. Its
//! presence is the ownership claim that `stop` acts on, so writes go through a
//! temporary sibling and a rename to avoid exposing a half-written PID.

use std::fs;
use std::io;

use camino::Utf8Path;
use tracing::debug;

use crate::ServerError;

/// Replaces the PID file contents with `pid`.
pub(super) fn write_pid(path: &Utf8Path, pid: u32) -> Result<(), ServerError> {
    let map_error = |source| ServerError::WritePid {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(map_error)?;
    }
    let temp_path = path.with_extension("pid.tmp");
    fs::write(&temp_path, pid.to_string()).map_err(map_error)?;
    fs::rename(&temp_path, path).map_err(map_error)?;
    debug!(%path, pid, "wrote pid file");
    Ok(())
}

/// Reads the PID recorded at `path`.
///
/// Returns `Ok(None)` when the file does not exist. Surrounding whitespace is
/// ignored.
pub(super) fn read_pid(path: &Utf8Path) -> Result<Option<u32>, ServerError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ServerError::ReadPid {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    content
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|source| ServerError::ParsePid {
            path: path.to_path_buf(),
            source,
        })
}

/// Deletes the PID file. A file that is already gone is not an error.
pub(super) fn remove_pid(path: &Utf8Path) -> Result<(), ServerError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(%path, "removed pid file");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ServerError::RemovePid {
            path: path.to_path_buf(),
            source,
        }),
    }
}
