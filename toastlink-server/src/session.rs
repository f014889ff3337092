//! One connected device
//!
//! A session owns both halves of the link. Outbound traffic goes through
//! the single-slot mailbox and its drain task; inbound frames are decoded
//! and dispatched in order on the session task itself.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use toastlink_protocol::{HostCodec, MAX_FRAME_SIZE};
use toastlink_utils::{Result, ToastlinkError};

use crate::bridge::Bridge;
use crate::config::AppConfig;
use crate::outbound::{OutboundChannel, DEFAULT_DRAIN_INTERVAL};

/// Link settings of a session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub drain_interval: Duration,
    pub max_frame_size: usize,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            drain_interval: config.outbound.drain_interval(),
            max_frame_size: config.transport.max_frame_size,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Serve one device over `reader`/`writer` until the link ends or
/// `shutdown_rx` fires
///
/// Returns `Ok` on shutdown. A peer that disconnects ends the session with
/// [`ToastlinkError::ConnectionClosed`]; broken framing or a failed write
/// ends it with [`ToastlinkError::Transport`].
pub async fn serve<R, W>(
    bridge: Bridge,
    reader: R,
    writer: W,
    options: SessionOptions,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("session", id = %session_id);

    run_session(bridge, reader, writer, options, shutdown_rx)
        .instrument(span)
        .await
}

async fn run_session<R, W>(
    bridge: Bridge,
    reader: R,
    writer: W,
    options: SessionOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("Session started");

    let (session_shutdown_tx, _) = broadcast::channel::<()>(1);
    let (sender, channel) = OutboundChannel::new(options.drain_interval);

    let framed_writer = FramedWrite::new(writer, HostCodec::with_max_frame_size(options.max_frame_size));
    let mut drain = tokio::spawn(
        channel
            .run(framed_writer, session_shutdown_tx.subscribe())
            .in_current_span(),
    );

    bridge.attach(sender).await;

    // Replay the full host state without holding up the receive loop
    let initial = bridge.clone();
    tokio::spawn(
        async move {
            match initial.reconcile_now().await {
                Ok(count) => debug!(count, "Initial state sent"),
                Err(e) => warn!("Initial reconciliation failed: {}", e),
            }
        }
        .in_current_span(),
    );

    let mut frames = FramedRead::new(reader, HostCodec::with_max_frame_size(options.max_frame_size));

    let result = loop {
        tokio::select! {
            frame = frames.next() => {
                match frame {
                    Some(Ok(Ok(message))) => {
                        debug!(action = ?message.action, key = %message.key, "Inbound message");
                        if let Err(e) = bridge.handle_inbound(message).await {
                            if e.is_fatal() {
                                break Err(e);
                            }
                            warn!("Failed to handle inbound message: {}", e);
                        }
                    }
                    Some(Ok(Err(e))) => {
                        warn!("Dropping malformed message: {}", e);
                    }
                    Some(Err(e)) => {
                        break Err(ToastlinkError::transport(format!("read failed: {}", e)));
                    }
                    None => {
                        info!("Peer closed the connection");
                        break Err(ToastlinkError::ConnectionClosed);
                    }
                }
            }
            drained = &mut drain => {
                break match drained {
                    Ok(Ok(())) => Err(ToastlinkError::ChannelClosed),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(ToastlinkError::internal(format!("drain task failed: {}", e))),
                };
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing session");
                break Ok(());
            }
        }
    };

    // Stop the drain loop; a pending message is dropped, not flushed
    let _ = session_shutdown_tx.send(());
    drain.abort();
    bridge.detach();

    match &result {
        Ok(()) | Err(ToastlinkError::ConnectionClosed) => info!("Session ended"),
        Err(e) => warn!("Session ended: {}", e),
    }
    result
}
