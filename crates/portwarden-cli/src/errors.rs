//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use portwarden::{LocatorError, ServerError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Locate(#[from] LocatorError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("server already running (pid {pid} recorded in {pid_file}); stop it first")]
    AlreadyRunning { pid: u32, pid_file: Utf8PathBuf },
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] io::Error),
}
