//! DriveMirror Daemon - One-way directory mirroring service
//!
//! This binary runs in the foreground (or as a systemd user service) and:
//! - Resolves the target Google Drive folder once at startup
//! - Catches up with a full reconciliation pass
//! - Mirrors live filesystem changes until shutdown
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The filesystem watcher is started before the catch-up pass so that changes
//! made while it runs are buffered, then the change monitor drains them. The
//! monitor loop is controlled by a `CancellationToken` that is triggered on
//! receipt of SIGTERM or SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use drivemirror_core::config::{Config, ConfigBuilder};
use drivemirror_core::ports::IRemoteStore;
use drivemirror_gdrive::client::DriveClient;
use drivemirror_gdrive::provider::DriveRemoteStore;
use drivemirror_gdrive::token::load_access_token;
use drivemirror_sync::monitor::{ChangeMonitor, MonitorExit};
use drivemirror_sync::readiness::ReadinessPolicy;
use drivemirror_sync::reconciler::Reconciler;
use drivemirror_sync::watcher::FileWatcher;
use drivemirror_sync::{resolve_target, validate_local_dir, SyncError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "drivemirror",
    version,
    about = "Mirror a local directory into a Google Drive folder"
)]
struct Cli {
    /// Directory to mirror (overrides sync.local_dir)
    local_dir: Option<PathBuf>,

    /// Display name of the remote folder (overrides sync.remote_folder)
    remote_folder: Option<String>,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Run the startup reconciliation only, then exit
    #[arg(long)]
    once: bool,
}

/// Loads the config file and applies command-line overrides
///
/// An explicit `--config` must load; the default location falls back to
/// built-in defaults.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let mut builder = ConfigBuilder::from_config(loaded);
    if let Some(dir) = &cli.local_dir {
        builder = builder.local_dir(dir.clone());
    }
    if let Some(folder) = &cli.remote_folder {
        builder = builder.remote_folder(folder.clone());
    }
    if cli.json {
        builder = builder.logging_json(true);
    }

    builder.build_validated().map_err(|errors| {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::anyhow!("Invalid configuration: {}", details.join("; "))
    })
}

/// Tracing filter directive: `-v` flags win over the configured level
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Main service that runs the startup catch-up and the monitor loop
struct DaemonService {
    /// Merged, validated configuration
    config: Config,
    /// Directory treated as the source of truth
    local_dir: PathBuf,
    /// Display name of the remote folder
    remote_folder: String,
    /// Remote store adapter
    store: Arc<dyn IRemoteStore>,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a service backed by the Google Drive adapter
    fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let token = load_access_token(&config.remote)?;
        let client = DriveClient::with_options(
            token,
            &config.remote.api_base_url,
            config.remote.request_timeout(),
        )
        .context("Failed to create Drive client")?;

        Self::with_store(config, Arc::new(DriveRemoteStore::new(client)), shutdown)
    }

    /// Creates a service over an arbitrary remote store
    fn with_store(
        config: Config,
        store: Arc<dyn IRemoteStore>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let local_dir = config
            .sync
            .local_dir
            .clone()
            .context("sync.local_dir is not set")?;
        let remote_folder = config
            .sync
            .remote_folder
            .clone()
            .context("sync.remote_folder is not set")?;

        Ok(Self {
            config,
            local_dir,
            remote_folder,
            store,
            shutdown,
        })
    }

    /// Runs the service
    ///
    /// 1. Validates the local directory and resolves the remote folder
    /// 2. Starts the watcher (skipped with `once`)
    /// 3. Runs the catch-up reconciliation
    /// 4. Drains filesystem events until shutdown or watch failure
    async fn run(&self, once: bool) -> Result<()> {
        validate_local_dir(&self.local_dir).await?;
        let folder = resolve_target(self.store.as_ref(), &self.remote_folder).await?;

        let readiness = ReadinessPolicy::from(&self.config.readiness);
        let reconciler = Reconciler::new(Arc::clone(&self.store), readiness);

        if once {
            let report = reconciler.reconcile(&self.local_dir, &folder).await?;
            if report.has_errors() {
                warn!(errors = report.errors.len(), "Reconciliation finished with errors");
            }
            return Ok(());
        }

        let (watcher, mut events) = FileWatcher::new(&self.local_dir, self.config.sync.event_buffer)
            .map_err(|e| SyncError::Watch(format!("{e:#}")))?;

        let report = reconciler.reconcile(&self.local_dir, &folder).await?;
        if report.has_errors() {
            warn!(errors = report.errors.len(), "Catch-up finished with errors");
        }

        if self.shutdown.is_cancelled() {
            info!("Shutdown requested during catch-up");
            return Ok(());
        }

        let mut monitor = ChangeMonitor::new(Arc::clone(&self.store), folder, readiness)
            .with_forget_on_delete(self.config.sync.forget_on_delete);

        let exit = monitor.run(&mut events, self.shutdown.clone()).await;

        if let Err(e) = watcher.stop() {
            warn!(error = %e, "Failed to stop watcher cleanly");
        }

        match exit {
            MonitorExit::Shutdown => Ok(()),
            MonitorExit::WatchFailed(reason) => Err(SyncError::Watch(reason).into()),
        }
    }
}

// ============================================================================
// Signal handling
// ============================================================================

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let (level, json) = match &config {
        Ok(c) => (c.logging.level.clone(), c.logging.json),
        Err(_) => ("info".to_string(), cli.json),
    };
    init_tracing(&log_filter(cli.verbose, &level), json);
    let config = config?;

    info!("DriveMirror starting");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token)?;
    let result = service.run(cli.once).await;

    match &result {
        Ok(()) => info!("DriveMirror shut down gracefully"),
        Err(e) => error!(error = %e, "DriveMirror exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
