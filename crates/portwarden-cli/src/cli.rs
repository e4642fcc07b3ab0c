//! Command-line argument definitions.

use clap::{Parser, Subcommand};

/// Starts, stops, and watches the static HTTP server used by end-to-end
/// tests.
///
/// Configuration flags such as `--port` or `--pid-file` must come before the
/// command.
#[derive(Parser, Debug)]
#[command(name = "portwarden", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Spawns the server against the build directory and waits for its port.
    Start,
    /// Terminates the server recorded in the PID file.
    Stop,
    /// Reports the PID file and whether the port accepts connections.
    Status,
    /// Waits for a server started elsewhere to listen, or to go away.
    Wait {
        /// Wait for the port to stop accepting connections instead.
        #[arg(long)]
        stopped: bool,
    },
}
