//! Command-line runtime for `portwarden`.
//!
//! The runtime splits configuration flags from the command, loads layered
//! configuration, installs telemetry, and runs one lifecycle command. IO
//! streams and the configuration loader are parameters so tests can drive
//! the whole flow in-process.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod errors;
mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub(crate) use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let result = Cli::try_parse_from(&split.command_arguments)
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            let config = loader.load(&split.config_arguments)?;
            telemetry::initialise(&config)?;
            commands::execute(cli.command, &config)
        })
        .and_then(|outcome| {
            writeln!(stdout, "{}", outcome.message).map_err(AppError::WriteOutput)?;
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            // Help and version output is a successful request.
            if write!(stdout, "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            // Nothing is left to report to if stderr itself is broken.
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
