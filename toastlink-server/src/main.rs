//! toastlink daemon

mod cli;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use toastlink_server::bridge::Bridge;
use toastlink_server::config::AppConfig;
use toastlink_server::directory::{AppDirectory, FileStore};
use toastlink_server::host::{FileSnapshotSource, LogToastSurface, SnapshotWatcher};
use toastlink_server::session::SessionOptions;
use toastlink_server::tcp;
use toastlink_utils::{ensure_all_dirs, init_logging_with_config, LogConfig, Result};

use cli::Args;

/// Run the bridge daemon until Ctrl-C
async fn run_daemon(config: AppConfig) -> Result<()> {
    info!("toastlink bridge starting");

    ensure_all_dirs()?;

    let directory_path = config.directory.resolved_path();
    let directory = AppDirectory::open(FileStore::new(&directory_path))?;
    info!(
        "Loaded {} app directory entries from {}",
        directory.len(),
        directory_path.display()
    );

    let snapshot_path = config.source.resolved_snapshot_file();
    let source = Arc::new(FileSnapshotSource::new(
        &snapshot_path,
        config.bridge.self_package_family.clone(),
    ));
    let surface = Arc::new(LogToastSurface::new());
    let bridge = Bridge::new(source, surface, directory, config.bridge.forwarding);

    // Pick up apps already on screen before the device connects
    if let Err(e) = bridge.reconcile_now().await {
        warn!("Initial reconciliation failed: {}", e);
    }

    if config.source.watch {
        let watcher = SnapshotWatcher::new(&snapshot_path)?;
        tokio::spawn(watcher.run(bridge.clone()));
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    let listener = tcp::bind(&config.transport.listen_addr).await?;
    let accept = tokio::spawn(tcp::run_tcp_accept_loop(
        listener,
        bridge.clone(),
        SessionOptions::from_config(&config),
        shutdown_tx.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    // Graceful shutdown
    let _ = shutdown_tx.send(());
    let _ = accept.await;

    info!("toastlink bridge stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    init_logging_with_config(LogConfig::daemon().verbosity(args.verbose))?;

    let config = args.load_config()?;
    run_daemon(config).await
}
