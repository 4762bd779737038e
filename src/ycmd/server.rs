//! Launching and owning the ycmd subprocess.

use std::io::Write;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tempfile::NamedTempFile;
use tokio::process::{Child, Command};

use crate::error::{BridgeError, Result};
use crate::session::Session;

/// How ycmd gets started.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// ycmd package directory or its `__main__.py`
    pub ycmd_path: PathBuf,
    pub python: PathBuf,
    pub idle_suicide_seconds: u64,
    pub log_level: String,
    /// Where ycmd writes its stdout/stderr logs
    pub log_dir: PathBuf,
}

impl ServerConfig {
    pub fn new(ycmd_path: impl Into<PathBuf>, python: impl Into<PathBuf>) -> Self {
        Self {
            ycmd_path: ycmd_path.into(),
            python: python.into(),
            idle_suicide_seconds: 300,
            log_level: "debug".to_string(),
            log_dir: std::env::temp_dir(),
        }
    }

    /// Arguments passed to the interpreter, ycmd path first.
    pub fn args(&self, port: u16, options_file: &Path) -> Vec<String> {
        vec![
            self.ycmd_path.to_string_lossy().into_owned(),
            format!("--port={}", port),
            format!("--options_file={}", options_file.display()),
            format!("--idle_suicide_seconds={}", self.idle_suicide_seconds),
            format!("--log={}", self.log_level),
            "--keep_logfiles".to_string(),
            format!("--stdout={}", self.log_dir.join("ycmd-out.log").display()),
            format!("--stderr={}", self.log_dir.join("ycmd-err.log").display()),
        ]
    }
}

/// Locates a Python interpreter on `PATH`.
pub fn find_python() -> Result<PathBuf> {
    which::which("python")
        .or_else(|_| which::which("python3"))
        .map_err(|e| BridgeError::Settings(format!("no python interpreter on PATH: {}", e)))
}

/// Asks the OS for an unused loopback port.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Writes the session settings (secret included) to a temp file.
pub fn write_options_file(session: &Session) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("acmeide")
        .suffix(".json")
        .tempfile()?;
    file.write_all(session.settings_json()?.as_bytes())?;
    file.flush()?;
    tracing::info!("Wrote temporary settings file: {}", file.path().display());
    Ok(file)
}

/// A running ycmd. Owns the child and its options file.
pub struct YcmdServer {
    child: Child,
    port: u16,
    _options_file: NamedTempFile,
}

impl YcmdServer {
    /// Picks a port, records it in the session, writes the options file and
    /// spawns ycmd. The session must already hold its final settings.
    pub fn start(config: &ServerConfig, session: &Session) -> Result<Self> {
        let port = free_port()?;
        session.set_port(port);
        let options_file = write_options_file(session)?;

        let child = Command::new(&config.python)
            .args(config.args(port, options_file.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to spawn {}: {}", config.python.display(), e),
                ))
            })?;

        tracing::info!(
            "Started ycmd on port {} with options file {}",
            port,
            options_file.path().display()
        );

        Ok(Self {
            child,
            port,
            _options_file: options_file,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for ycmd to exit.
    pub async fn wait(mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await?;
        tracing::warn!("ycmd on port {} exited: {}", self.port, status);
        Ok(status)
    }
}
