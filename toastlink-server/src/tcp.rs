//! TCP listener serving one device at a time

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use toastlink_utils::{Result, ToastlinkError};

use crate::bridge::Bridge;
use crate::session::{serve, SessionOptions};

/// Bind the listener the device connects to
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ToastlinkError::transport(format!("Failed to bind {}: {}", addr, e)))?;

    match listener.local_addr() {
        Ok(local) => info!("TCP listener bound to {}", local),
        Err(_) => info!("TCP listener bound to {}", addr),
    }
    Ok(listener)
}

/// Run the TCP accept loop
///
/// Each accepted connection is served to completion before the next one is
/// accepted; a dropped link waits for the device to reconnect.
pub async fn run_tcp_accept_loop(
    listener: TcpListener,
    bridge: Bridge,
    options: SessionOptions,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        info!("Device connected from {}", peer_addr);
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY: {}", e);
                        }

                        let (reader, writer) = stream.into_split();
                        let outcome = serve(
                            bridge.clone(),
                            reader,
                            writer,
                            options,
                            shutdown_tx.subscribe(),
                        )
                        .await;

                        match outcome {
                            Ok(()) => {
                                info!("Session with {} closed, stopping accept loop", peer_addr);
                                break;
                            }
                            Err(ToastlinkError::ConnectionClosed) => {
                                info!("Device {} disconnected", peer_addr);
                            }
                            Err(e) => {
                                warn!("Session with {} failed: {}", peer_addr, e);
                            }
                        }
                    }
                    Err(e) => {
                        error!("TCP accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping TCP accept loop");
                break;
            }
        }
    }
}
