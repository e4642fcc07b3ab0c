//! Lifecycle command implementations.

use camino::Utf8PathBuf;
use portwarden::{
    ExecutableLocator, FixedLocator, LogSink, ManagedServer, ManagedServerConfig, ObservedServer,
    PortWaiter, SearchLocator,
};
use portwarden_config::{Config, DEFAULT_SERVER_NAME};
use tracing::warn;

use crate::AppError;
use crate::cli::CliCommand;

/// Text for stdout and whether the command met its goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandOutcome {
    pub(crate) message: String,
    pub(crate) success: bool,
}

impl CommandOutcome {
    fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

pub(crate) fn execute(command: CliCommand, config: &Config) -> Result<CommandOutcome, AppError> {
    match command {
        CliCommand::Start => start(config),
        CliCommand::Stop => stop(config),
        CliCommand::Status => status(config),
        CliCommand::Wait { stopped } => wait(config, stopped),
    }
}

fn start(config: &Config) -> Result<CommandOutcome, AppError> {
    let executable = resolve_executable(config)?;
    let name = executable
        .file_name()
        .unwrap_or(executable.as_str())
        .to_owned();
    let mut server = ManagedServer::new(managed_config(config, executable));
    // A live recorded server would keep the port open and mask a failed spawn.
    if let Some(pid) = server.running_pid()? {
        return Err(AppError::AlreadyRunning {
            pid,
            pid_file: config.pid_file(),
        });
    }
    server.start()?;

    if let Err(error) = server.wait_until_ready(config.start_timeout()) {
        if let Err(stop_error) = server.stop() {
            warn!(%stop_error, "failed to stop server that never became ready");
        }
        return Err(error.into());
    }

    let pid = server
        .pid()
        .map_or_else(|| String::from("unknown"), |pid| pid.to_string());
    Ok(CommandOutcome::success(format!(
        "started {name} (pid {pid}) on port {}",
        config.port()
    )))
}

fn stop(config: &Config) -> Result<CommandOutcome, AppError> {
    let mut server = ManagedServer::new(managed_config(config, configured_executable(config)));
    let message = if server.stop()? {
        String::from("stopped server (pid file removed)")
    } else {
        format!("no pid file at {}; nothing to stop", config.pid_file())
    };
    Ok(CommandOutcome::success(message))
}

fn status(config: &Config) -> Result<CommandOutcome, AppError> {
    let server = ManagedServer::new(managed_config(config, configured_executable(config)));
    let pid_line = match server.recorded_pid()? {
        Some(pid) => format!("pid file {} records pid {pid}", config.pid_file()),
        None => format!("no pid file at {}", config.pid_file()),
    };
    let listening = PortWaiter::new(config.host(), config.port()).is_open()?;
    let port_line = format!(
        "{}:{} is {}",
        config.host(),
        config.port(),
        if listening { "listening" } else { "not listening" }
    );
    Ok(CommandOutcome {
        message: format!("{pid_line}\n{port_line}"),
        success: listening,
    })
}

fn wait(config: &Config, stopped: bool) -> Result<CommandOutcome, AppError> {
    let observed = ObservedServer::new(config.host(), config.port())
        .with_start_timeout(config.start_timeout())
        .with_stop_timeout(config.stop_timeout());
    let address = format!("{}:{}", config.host(), config.port());
    let message = if stopped {
        observed.stop()?;
        format!("nothing listening on {address}")
    } else {
        observed.start()?;
        format!("server listening on {address}")
    };
    Ok(CommandOutcome::success(message))
}

/// Uses the configured binary when set, otherwise searches `PATH` and the
/// `node_modules/.bin` directories above the working directory.
fn resolve_executable(config: &Config) -> Result<Utf8PathBuf, AppError> {
    let path = match config.server_bin() {
        Some(path) => FixedLocator::new(path).locate(DEFAULT_SERVER_NAME)?,
        None => SearchLocator::from_current_dir()?.locate(DEFAULT_SERVER_NAME)?,
    };
    Ok(path)
}

/// The binary `stop` and `status` pass along; neither of them runs it.
fn configured_executable(config: &Config) -> Utf8PathBuf {
    config
        .server_bin()
        .map_or_else(|| Utf8PathBuf::from(DEFAULT_SERVER_NAME), ToOwned::to_owned)
}

/// Without a log file the server's output is discarded, since the server
/// outlives the command and must not hold its stdout open.
fn managed_config(config: &Config, executable: Utf8PathBuf) -> ManagedServerConfig {
    let log_sink = config
        .log_file()
        .map_or(LogSink::Null, |path| LogSink::File(path.to_owned()));
    ManagedServerConfig::new(executable, config.build_path())
        .with_host(config.host())
        .with_port(config.port())
        .with_pid_file(config.pid_file())
        .with_log_sink(log_sink)
}
