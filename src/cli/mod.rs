use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use acme_ide::config::{DEFAULT_IDLE_SUICIDE_SECONDS, DEFAULT_YCMD_LOG_LEVEL};
use acme_ide::{
    Config, Dispatcher, IdeRegistry, Plan9Acme, Session, WindowClassifier, YcmdClient, YcmdServer,
};

#[derive(Parser)]
#[command(name = "acme-ide")]
#[command(about = "Go-to-definition for Acme windows, backed by ycmd")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Start ycmd from a checkout and watch every Python window
    acme-ide ~/src/ycmd/ycmd

    # Use a specific interpreter and keep ycmd's logs somewhere durable
    acme-ide ~/src/ycmd/ycmd --python /usr/bin/python3 --log-dir ~/lib/ycmd

LOGGING:
    Set RUST_LOG=acme_ide=debug to see every request and event."#)]
pub struct Cli {
    /// Path to ycmd (the package directory or its __main__.py)
    pub ycmd_path: PathBuf,

    /// ycmd settings file replacing the built-in defaults
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Python interpreter for ycmd (default: python or python3 on PATH)
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Seconds of inactivity after which ycmd shuts itself down
    #[arg(long, default_value_t = DEFAULT_IDLE_SUICIDE_SECONDS)]
    pub idle_suicide_seconds: u64,

    /// Seconds between /ready probes
    #[arg(long, default_value = "5")]
    pub ready_interval_secs: u64,

    /// Directory for ycmd's stdout/stderr logs (default: system temp dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// ycmd's own log level
    #[arg(long, default_value = DEFAULT_YCMD_LOG_LEVEL)]
    pub ycmd_log: String,
}

impl Cli {
    pub fn config(&self) -> Config {
        let mut config = Config::new(&self.ycmd_path);
        config.settings_path = self.settings.clone();
        config.python = self.python.clone();
        config.idle_suicide_seconds = self.idle_suicide_seconds;
        config.ready_interval = Duration::from_secs(self.ready_interval_secs.max(1));
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        config.ycmd_log_level = self.ycmd_log.clone();
        config
    }
}

/// Starts ycmd, waits for it, then watches Acme until Acme goes away or
/// ycmd dies.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let settings = config
        .load_settings()
        .context("Failed to load ycmd settings")?;
    let session = Arc::new(Session::generate(settings));
    let server_config = config
        .server_config()
        .context("Failed to locate a Python interpreter")?;
    let server = YcmdServer::start(&server_config, &session).context("Failed to start ycmd")?;
    let mut server_exit = tokio::spawn(server.wait());

    let client = YcmdClient::new(session.clone(), config.http_timeout)?;
    tokio::select! {
        ready = client.poll_ready(config.ready_interval) => {
            if ready {
                tracing::info!("ycmd ready");
            } else {
                tracing::warn!("ycmd answered /ready with false; continuing");
            }
        }
        status = &mut server_exit => {
            anyhow::bail!("ycmd exited before becoming ready: {:?}", status);
        }
    }

    let shutdown = CancellationToken::new();
    let keepalive = client.spawn_keepalive(config.ready_interval, shutdown.clone());

    let acme: Arc<dyn acme_ide::Acme> = Arc::new(Plan9Acme::new());
    let dispatcher = Dispatcher::new(
        acme,
        client,
        Arc::new(IdeRegistry::new()),
        Arc::new(WindowClassifier::for_this_host()),
    );

    let result = tokio::select! {
        result = dispatcher.run(shutdown.clone()) => result.context("Lost connection to acme"),
        status = &mut server_exit => Err(anyhow::anyhow!("ycmd exited: {:?}", status)),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    shutdown.cancel();
    let _ = keepalive.await;
    server_exit.abort();
    result
}
