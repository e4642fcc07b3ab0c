//! Entry point for the `portwarden` binary.
//!
//! Delegates to [`portwarden_cli::run`], which loads configuration, installs
//! telemetry, and dispatches the requested lifecycle command.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    portwarden_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
