//! Discovery of the server binary.
//!
//! Node projects install CLI tools under `node_modules/.bin` of the package
//! root, which may be any ancestor of the directory a command runs from. The
//! search checks `PATH` first and then walks up the directory tree.

use std::env;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory, relative to a package root, where npm links installed binaries.
pub const DEFAULT_RELATIVE_DIR: &str = "node_modules/.bin";

/// Errors raised while locating an executable.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error(
        "{name} not found on PATH or in {relative} above {start}; install it with `npm install --save-dev {name}` or set the server binary explicitly"
    )]
    NotFound {
        name: String,
        start: Utf8PathBuf,
        relative: Utf8PathBuf,
    },
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("current directory is not valid UTF-8: {0}")]
    NonUtf8CurrentDir(String),
}

/// Resolves an executable name to a path.
pub trait ExecutableLocator {
    fn locate(&self, name: &str) -> Result<Utf8PathBuf, LocatorError>;
}

/// Always answers with the configured path, whatever name is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLocator(Utf8PathBuf);

impl FixedLocator {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into())
    }
}

impl ExecutableLocator for FixedLocator {
    fn locate(&self, _name: &str) -> Result<Utf8PathBuf, LocatorError> {
        Ok(self.0.clone())
    }
}

/// Searches `PATH`, then `<ancestor>/<relative_dir>` for each ancestor of the
/// start directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLocator {
    start_dir: Utf8PathBuf,
    relative_dir: Utf8PathBuf,
    search_path: bool,
}

impl SearchLocator {
    pub fn new(start_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            relative_dir: Utf8PathBuf::from(DEFAULT_RELATIVE_DIR),
            search_path: true,
        }
    }

    /// Starts the search from the process working directory.
    pub fn from_current_dir() -> Result<Self, LocatorError> {
        let cwd = env::current_dir().map_err(LocatorError::CurrentDir)?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|path| LocatorError::NonUtf8CurrentDir(path.display().to_string()))?;
        Ok(Self::new(cwd))
    }

    #[must_use]
    pub fn with_relative_dir(mut self, relative_dir: impl Into<Utf8PathBuf>) -> Self {
        self.relative_dir = relative_dir.into();
        self
    }

    /// Restricts the search to the ancestor walk.
    #[must_use]
    pub fn without_path_lookup(mut self) -> Self {
        self.search_path = false;
        self
    }

    pub fn start_dir(&self) -> &Utf8Path {
        &self.start_dir
    }

    pub fn relative_dir(&self) -> &Utf8Path {
        &self.relative_dir
    }

    fn on_path(&self, name: &str) -> Option<Utf8PathBuf> {
        if !self.search_path {
            return None;
        }
        let found = which::which(name).ok()?;
        Utf8PathBuf::from_path_buf(found).ok()
    }
}

impl ExecutableLocator for SearchLocator {
    fn locate(&self, name: &str) -> Result<Utf8PathBuf, LocatorError> {
        if let Some(path) = self.on_path(name) {
            debug!(%path, name, "found executable on PATH");
            return Ok(path);
        }
        find_in_ancestors(&self.start_dir, &self.relative_dir, name, |candidate| {
            candidate.is_file()
        })
        .inspect(|path| debug!(%path, name, "found executable in ancestor directory"))
        .ok_or_else(|| LocatorError::NotFound {
            name: name.to_owned(),
            start: self.start_dir.clone(),
            relative: self.relative_dir.clone(),
        })
    }
}

/// Returns the first `<ancestor>/<relative>/<name>` accepted by `exists`,
/// checking `start` itself first and stopping after the filesystem root.
pub fn find_in_ancestors(
    start: &Utf8Path,
    relative: &Utf8Path,
    name: &str,
    exists: impl Fn(&Utf8Path) -> bool,
) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|ancestor| ancestor.join(relative).join(name))
        .find(|candidate| exists(candidate))
}
