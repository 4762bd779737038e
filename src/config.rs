//! Runtime settings for the bridge itself (not ycmd's options).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::session::YcmdSettings;
use crate::ycmd::{find_python, ServerConfig};

pub const DEFAULT_READY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_SUICIDE_SECONDS: u64 = 300;
pub const DEFAULT_YCMD_LOG_LEVEL: &str = "debug";

#[derive(Debug, Clone)]
pub struct Config {
    pub ycmd_path: PathBuf,
    /// Replacement for the built-in ycmd settings
    pub settings_path: Option<PathBuf>,
    /// Interpreter for ycmd; looked up on `PATH` when unset
    pub python: Option<PathBuf>,
    pub idle_suicide_seconds: u64,
    /// Spacing of `/ready` probes, both at startup and for keep-alive
    pub ready_interval: Duration,
    pub http_timeout: Duration,
    pub log_dir: PathBuf,
    pub ycmd_log_level: String,
}

impl Config {
    pub fn new(ycmd_path: impl Into<PathBuf>) -> Self {
        Self {
            ycmd_path: ycmd_path.into(),
            settings_path: None,
            python: None,
            idle_suicide_seconds: DEFAULT_IDLE_SUICIDE_SECONDS,
            ready_interval: DEFAULT_READY_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            log_dir: std::env::temp_dir(),
            ycmd_log_level: DEFAULT_YCMD_LOG_LEVEL.to_string(),
        }
    }

    /// ycmd settings from `settings_path`, or the built-in defaults.
    pub fn load_settings(&self) -> Result<YcmdSettings> {
        match &self.settings_path {
            Some(path) => {
                tracing::info!("Loading ycmd settings from {}", path.display());
                YcmdSettings::from_file(path)
            }
            None => YcmdSettings::defaults(),
        }
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        let python = match &self.python {
            Some(python) => python.clone(),
            None => find_python()?,
        };
        let mut server = ServerConfig::new(&self.ycmd_path, python);
        server.idle_suicide_seconds = self.idle_suicide_seconds;
        server.log_level = self.ycmd_log_level.clone();
        server.log_dir = self.log_dir.clone();
        Ok(server)
    }
}
