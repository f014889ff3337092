//! Single-slot outbound mailbox
//!
//! Producers hand messages to an [`OutboundSender`]; the mailbox holds one
//! message at a time. The [`OutboundChannel`] drain loop takes at most one
//! message per tick and writes it to the link.

use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, trace, warn};

use toastlink_protocol::{CodecError, HostCodec, OutboundMessage};
use toastlink_utils::{Result, ToastlinkError};

/// Default period of the drain loop
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(500);

/// Mailbox capacity
const SLOT_CAPACITY: usize = 1;

/// Why a message could not be placed without waiting
#[derive(Debug, thiserror::Error)]
pub enum OfferError {
    /// The slot is occupied; the message is handed back
    #[error("outbound slot is full")]
    Full(OutboundMessage),

    /// The drain loop has stopped
    #[error("outbound channel is closed")]
    Closed(OutboundMessage),
}

/// Producer side of the mailbox
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<OutboundMessage>,
}

impl OutboundSender {
    /// Place `msg` in the slot, waiting until it is free
    pub async fn offer(&self, msg: OutboundMessage) -> Result<()> {
        trace!(?msg, "Offering outbound message");
        self.tx
            .send(msg)
            .await
            .map_err(|_| ToastlinkError::ChannelClosed)
    }

    /// Place `msg` in the slot if it is free
    pub fn try_offer(&self, msg: OutboundMessage) -> std::result::Result<(), OfferError> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(msg) => OfferError::Full(msg),
            mpsc::error::TrySendError::Closed(msg) => OfferError::Closed(msg),
        })
    }

    /// Whether the drain loop has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn from_raw(tx: mpsc::Sender<OutboundMessage>) -> Self {
        Self { tx }
    }
}

/// Consumer side of the mailbox
#[derive(Debug)]
pub struct OutboundChannel {
    rx: mpsc::Receiver<OutboundMessage>,
    interval: Duration,
}

impl OutboundChannel {
    /// Create a mailbox drained every `interval`
    pub fn new(interval: Duration) -> (OutboundSender, Self) {
        let (tx, rx) = mpsc::channel(SLOT_CAPACITY);
        (OutboundSender { tx }, Self { rx, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[cfg(test)]
    pub(crate) fn try_take(&mut self) -> Option<OutboundMessage> {
        self.rx.try_recv().ok()
    }

    /// Drain the mailbox onto `writer` until shutdown or a write failure
    ///
    /// Returns `Ok` on shutdown or once every sender is gone. A failed write
    /// is returned as a transport error. Whatever is still in the slot when
    /// the loop ends is dropped.
    pub async fn run<W>(
        mut self,
        mut writer: FramedWrite<W, HostCodec>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(interval_ms = self.interval.as_millis() as u64, "Drain loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let msg = match self.rx.try_recv() {
                        Ok(msg) => msg,
                        Err(mpsc::error::TryRecvError::Empty) => continue,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            debug!("All outbound senders dropped, stopping drain loop");
                            return Ok(());
                        }
                    };

                    match writer.send(msg).await {
                        Ok(()) => {}
                        Err(CodecError::FrameTooLarge { size, max }) => {
                            // Nothing was written; the link is still usable
                            warn!(size, max, "Dropping outbound message larger than a frame");
                        }
                        Err(e) => {
                            return Err(ToastlinkError::transport(format!("write failed: {}", e)));
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping drain loop");
                    return Ok(());
                }
            }
        }
    }
}
