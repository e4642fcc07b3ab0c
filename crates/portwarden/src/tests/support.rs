//! Fixtures shared by managed server tests.
//!
//! A [`ServerFixture`] lays out a throwaway project: a build directory at
//! `dist/app` and a shell script standing in for the HTTP server. The script
//! records its working directory and arguments, prints a line, and then
//! sleeps so there is a live process to signal.

use std::cell::RefCell;
use std::fs;
use std::net::TcpListener;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::fixture;
use tempfile::TempDir;

use crate::{LogSink, ManagedServer, ManagedServerConfig, ServerError, ServerGuard};

const FAKE_SERVER_NAME: &str = "fake-http-server";

pub(crate) struct ServerFixture {
    _dir: TempDir,
    root: Utf8PathBuf,
    port: u16,
}

impl ServerFixture {
    pub(crate) fn new() -> Result<Self> {
        let dir = TempDir::new().context("create fixture directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir: {}", path.display()))?;
        let fixture = Self {
            _dir: dir,
            port: vacant_port()?,
            root,
        };
        fs::create_dir_all(fixture.build_path()).context("create build directory")?;
        fs::create_dir_all(fixture.root.join("bin")).context("create bin directory")?;
        fixture.write_script()?;
        Ok(fixture)
    }

    fn write_script(&self) -> Result<()> {
        let args = self.args_file();
        let script = format!(
            "#!/bin/sh\n\
             printf '%s\\n%s\\n' \"$(pwd)\" \"$*\" > '{args}.tmp'\n\
             mv '{args}.tmp' '{args}'\n\
             echo \"fake server listening on port $2\"\n\
             exec sleep 30\n"
        );
        fs::write(self.executable(), script).context("write fake server")?;
        set_mode(&self.executable(), 0o755)
    }

    pub(crate) fn root(&self) -> Utf8PathBuf {
        self.root.clone()
    }

    pub(crate) fn build_path(&self) -> Utf8PathBuf {
        self.root.join("dist").join("app")
    }

    pub(crate) fn executable(&self) -> Utf8PathBuf {
        self.root.join("bin").join(FAKE_SERVER_NAME)
    }

    pub(crate) fn pid_file(&self) -> Utf8PathBuf {
        self.root.join("server.pid")
    }

    pub(crate) fn log_file(&self) -> Utf8PathBuf {
        self.root.join("server.log")
    }

    pub(crate) fn args_file(&self) -> Utf8PathBuf {
        self.root.join("args.txt")
    }

    /// Settings pointing at the fake server, with output discarded and the
    /// PID file kept inside the fixture directory.
    pub(crate) fn config(&self) -> ManagedServerConfig {
        ManagedServerConfig::new(self.executable(), self.build_path())
            .with_host("127.0.0.1")
            .with_port(self.port)
            .with_pid_file(self.pid_file())
            .with_log_sink(LogSink::Null)
            .with_exit_timeout(Duration::from_secs(1))
    }

    /// Writes `contents` under the fixture root with the given permission
    /// bits.
    pub(crate) fn write_file(&self, name: &str, contents: &str, mode: u32) -> Utf8PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write fixture file");
        set_mode(&path, mode).expect("set fixture file mode");
        path
    }
}

#[cfg(unix)]
fn set_mode(path: &Utf8Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("chmod {mode:o} {path}"))
}

#[cfg(not(unix))]
fn set_mode(_path: &Utf8Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn vacant_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe listener")?;
    Ok(listener.local_addr().context("read probe address")?.port())
}

#[fixture]
pub(crate) fn server_fixture() -> ServerFixture {
    ServerFixture::new().expect("create server fixture")
}

/// Scenario state for the managed server behaviour tests.
pub(crate) struct TestWorld {
    pub(crate) fixture: ServerFixture,
    pub(crate) config: ManagedServerConfig,
    pub(crate) server: Option<ManagedServer>,
    pub(crate) guard: Option<ServerGuard<ManagedServer>>,
    pub(crate) last_pid: Option<u32>,
    pub(crate) last_error: Option<ServerError>,
}

impl TestWorld {
    pub(crate) fn new() -> Result<Self> {
        let fixture = ServerFixture::new()?;
        let config = fixture.config();
        Ok(Self {
            fixture,
            config,
            server: None,
            guard: None,
            last_pid: None,
            last_error: None,
        })
    }

    pub(crate) fn server_mut(&mut self) -> &mut ManagedServer {
        let config = self.config.clone();
        self.server.get_or_insert_with(|| ManagedServer::new(config))
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        // Never leave a sleeping fake server behind when a scenario fails.
        drop(self.guard.take());
        if let Some(server) = self.server.as_mut() {
            if let Err(error) = server.stop() {
                eprintln!("failed to stop fake server: {error}");
            }
        }
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new().expect("create test world"))
}
