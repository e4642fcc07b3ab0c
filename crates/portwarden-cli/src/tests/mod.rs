//! In-process tests for the CLI runtime.

use super::*;

use std::ffi::OsString;
use std::fs;
use std::net::TcpListener;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use portwarden_config::Config;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    port: u16,
}

impl Workspace {
    fn config(&self) -> Config {
        Config {
            host: Some(String::from("127.0.0.1")),
            port: Some(self.port),
            pid_file: Some(self.root.join("server.pid")),
            build_path: Some(self.root.join("dist")),
            start_timeout_secs: Some(1),
            stop_timeout_secs: Some(1),
            ..Config::default()
        }
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 path");
    let port = TcpListener::bind(("127.0.0.1", 0))
        .expect("bind listener")
        .local_addr()
        .expect("local addr")
        .port();
    Workspace {
        _dir: dir,
        root,
        port,
    }
}

struct Output {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_cli(config: Config, args: &[&str]) -> Output {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let args = std::iter::once("portwarden")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = run_with_loader(
        args,
        &mut stdout,
        &mut stderr,
        &StaticConfigLoader { config },
    );
    Output {
        exit,
        stdout: String::from_utf8(stdout).expect("utf8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf8 stderr"),
    }
}

#[rstest]
fn stop_without_pid_file_reports_nothing_to_stop(workspace: Workspace) {
    let output = run_cli(workspace.config(), &["stop"]);

    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(
        output.stdout.contains("nothing to stop"),
        "stdout: {}",
        output.stdout
    );
    assert!(output.stdout.contains("server.pid"));
}

#[rstest]
fn status_fails_when_port_is_closed(workspace: Workspace) {
    let output = run_cli(workspace.config(), &["status"]);

    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stdout.contains("no pid file"),
        "stdout: {}",
        output.stdout
    );
    assert!(
        output.stdout.contains("not listening"),
        "stdout: {}",
        output.stdout
    );
}

#[rstest]
fn status_reports_listener_and_recorded_pid(workspace: Workspace) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let config = Config {
        port: Some(listener.local_addr().expect("local addr").port()),
        ..workspace.config()
    };
    fs::write(workspace.root.join("server.pid"), "4242\n").expect("seed pid file");

    let output = run_cli(config, &["status"]);

    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(
        output.stdout.contains("records pid 4242"),
        "stdout: {}",
        output.stdout
    );
    assert!(
        output.stdout.contains("is listening"),
        "stdout: {}",
        output.stdout
    );
}

#[rstest]
fn wait_succeeds_once_listener_exists(workspace: Workspace) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let config = Config {
        port: Some(listener.local_addr().expect("local addr").port()),
        ..workspace.config()
    };

    let output = run_cli(config, &["wait"]);

    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(
        output.stdout.contains("server listening"),
        "stdout: {}",
        output.stdout
    );
}

#[rstest]
fn wait_fails_when_nothing_listens(workspace: Workspace) {
    let output = run_cli(workspace.config(), &["wait"]);

    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stderr.contains("nothing was listening"),
        "stderr: {}",
        output.stderr
    );
}

#[rstest]
fn wait_stopped_succeeds_for_vacant_port(workspace: Workspace) {
    let output = run_cli(workspace.config(), &["wait", "--stopped"]);

    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(
        output.stdout.contains("nothing listening"),
        "stdout: {}",
        output.stdout
    );
}

#[rstest]
fn start_reports_missing_server_binary(workspace: Workspace) {
    let config = Config {
        server_bin: Some(workspace.root.join("angular-http-server")),
        ..workspace.config()
    };
    fs::create_dir_all(workspace.root.join("dist")).expect("create build dir");

    let output = run_cli(config, &["start"]);

    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stderr.contains("npm install"),
        "stderr: {}",
        output.stderr
    );
}

#[cfg(unix)]
#[rstest]
fn start_stops_server_that_never_listens(workspace: Workspace) {
    use std::os::unix::fs::PermissionsExt;

    let script = workspace.root.join("sleepy-server");
    fs::write(&script, "#!/bin/sh\nexec sleep 30\n").expect("write script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod script");
    fs::create_dir_all(workspace.root.join("dist")).expect("create build dir");
    let config = Config {
        server_bin: Some(script),
        ..workspace.config()
    };

    let output = run_cli(config, &["start"]);

    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stderr.contains("nothing was listening"),
        "stderr: {}",
        output.stderr
    );
    assert!(!workspace.root.join("server.pid").exists());
}

#[cfg(unix)]
#[rstest]
fn start_refuses_when_recorded_server_is_alive(workspace: Workspace) {
    use std::os::unix::fs::PermissionsExt;
    use std::process::Command;

    // A dying binary behind an already-open port must not be reported as
    // started.
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let mut running = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
    let pid_file = workspace.root.join("server.pid");
    fs::write(&pid_file, format!("{}\n", running.id())).expect("seed pid file");
    let script = workspace.root.join("dying-server");
    fs::write(&script, "#!/bin/sh\nexit 1\n").expect("write script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod script");
    fs::create_dir_all(workspace.root.join("dist")).expect("create build dir");
    let config = Config {
        server_bin: Some(script),
        port: Some(listener.local_addr().expect("local addr").port()),
        ..workspace.config()
    };

    let output = run_cli(config, &["start"]);

    running.kill().expect("kill sleep");
    running.wait().expect("reap sleep");
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stderr.contains("already running"),
        "stderr: {}",
        output.stderr
    );
    assert!(output.stdout.is_empty(), "stdout: {}", output.stdout);
    assert_eq!(
        fs::read_to_string(&pid_file).expect("read pid file").trim(),
        running.id().to_string()
    );
}

#[rstest]
#[case::missing_command(&[])]
#[case::unknown_command(&["restart"])]
fn usage_errors_go_to_stderr(workspace: Workspace, #[case] args: &[&str]) {
    let output = run_cli(workspace.config(), args);

    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(output.stderr.contains("Usage"), "stderr: {}", output.stderr);
}

#[rstest]
fn help_goes_to_stdout(workspace: Workspace) {
    let output = run_cli(workspace.config(), &["--help"]);

    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(output.stdout.contains("start"), "stdout: {}", output.stdout);
    assert!(output.stderr.is_empty());
}
