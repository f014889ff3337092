//! Bridge context shared by the session, the watcher and the host layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use toastlink_protocol::{InboundMessage, OutboundMessage};
use toastlink_utils::{Result, ToastlinkError};

use crate::directory::{AppDirectory, AppDirectoryEntry, LoadReport};
use crate::dispatch::{CommandDispatcher, InboundOutcome, ToastActivation};
use crate::host::{SnapshotSource, ToastSurface};
use crate::outbound::OutboundSender;
use crate::reconcile::Reconciler;

/// Reconciliation state, locked as one unit so passes never interleave
struct Engine {
    reconciler: Reconciler,
    directory: AppDirectory,
}

struct BridgeInner {
    source: Arc<dyn SnapshotSource>,
    surface: Arc<dyn ToastSurface>,
    engine: Mutex<Engine>,
    dispatcher: parking_lot::Mutex<CommandDispatcher>,
    /// Mailbox of the connected session, if any
    outbound: parking_lot::Mutex<Option<OutboundSender>>,
    /// Mirror host notifications while a session is attached
    forward_when_connected: bool,
    forwarding: AtomicBool,
}

/// Handle to the bridge; clones share the same state
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        surface: Arc<dyn ToastSurface>,
        directory: AppDirectory,
        forward_when_connected: bool,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                source,
                surface,
                engine: Mutex::new(Engine {
                    reconciler: Reconciler::new(),
                    directory,
                }),
                dispatcher: parking_lot::Mutex::new(CommandDispatcher::new()),
                outbound: parking_lot::Mutex::new(None),
                forward_when_connected,
                forwarding: AtomicBool::new(false),
            }),
        }
    }

    // ==================== Session lifecycle ====================

    /// Attach a session's mailbox
    ///
    /// Tracked state is reset so the next pass sends the device everything.
    pub async fn attach(&self, sender: OutboundSender) {
        let mut engine = self.inner.engine.lock().await;
        engine.reconciler.reset();
        *self.inner.outbound.lock() = Some(sender);
        self.inner
            .forwarding
            .store(self.inner.forward_when_connected, Ordering::SeqCst);
        debug!("Session attached");
    }

    /// Detach the session and clear the toasts of its device notifications
    pub fn detach(&self) {
        self.inner.forwarding.store(false, Ordering::SeqCst);
        self.inner.outbound.lock().take();
        self.inner.dispatcher.lock().clear(self.inner.surface.as_ref());
        debug!("Session detached");
    }

    /// Whether a session is attached and its drain loop still runs
    pub fn is_connected(&self) -> bool {
        self.inner
            .outbound
            .lock()
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    pub fn is_forwarding(&self) -> bool {
        self.inner.forwarding.load(Ordering::SeqCst)
    }

    fn sender(&self) -> Option<OutboundSender> {
        self.inner.outbound.lock().clone()
    }

    async fn send(&self, msg: OutboundMessage) -> Result<()> {
        let sender = self.sender().ok_or(ToastlinkError::NotConnected)?;
        sender.offer(msg).await
    }

    // ==================== Host notifications ====================

    /// Run one reconciliation pass against the current snapshot
    ///
    /// Returns the number of events offered to the device.
    pub async fn reconcile_now(&self) -> Result<usize> {
        let mut engine = self.inner.engine.lock().await;
        let Engine {
            reconciler,
            directory,
        } = &mut *engine;

        let snapshot = self.inner.source.list()?;
        let events = reconciler.reconcile(
            &snapshot,
            directory,
            self.inner.source.as_ref(),
            self.is_forwarding(),
        )?;

        if events.is_empty() {
            return Ok(0);
        }

        // Offered under the engine lock so passes stay in order on the wire
        let sender = self.sender().ok_or(ToastlinkError::NotConnected)?;
        let count = events.len();
        for event in events {
            sender.offer(event).await?;
        }

        debug!(count, "Offered reconciliation events");
        Ok(count)
    }

    // ==================== App directory ====================

    /// Reload the allow-list from its store
    pub async fn load_app_directory(&self) -> Result<LoadReport> {
        self.inner.engine.lock().await.directory.load()
    }

    /// Replace the allow-list, dropping entries marked for deletion
    pub async fn save_app_directory(&self, entries: Vec<AppDirectoryEntry>) -> Result<()> {
        self.inner.engine.lock().await.directory.save(entries)?;
        info!("App directory saved");
        Ok(())
    }

    /// Current allow-list entries
    pub async fn app_directory(&self) -> Vec<AppDirectoryEntry> {
        self.inner.engine.lock().await.directory.entries().to_vec()
    }

    // ==================== Commands to the device ====================

    /// Send a text reply to the sender behind a device key
    pub async fn send_sms(&self, key: &str, text: &str) -> Result<()> {
        info!(key, "Sending reply");
        self.send(OutboundMessage::reply(key, text)).await
    }

    /// Open the app behind a device notification on the device
    pub async fn open_app(&self, key: &str) -> Result<()> {
        info!(key, "Opening app on device");
        self.send(OutboundMessage::open(key)).await
    }

    /// Dismiss an incoming call on the device
    pub async fn dismiss_call(&self, key: &str) -> Result<()> {
        info!(key, "Dismissing call");
        self.send(OutboundMessage::remove(key)).await
    }

    /// Route a toast interaction to the matching command
    pub async fn toast_activated(&self, activation: ToastActivation) -> Result<()> {
        info!(key = activation.key(), ?activation, "Toast activated");
        self.send(activation.to_command()).await
    }

    /// Drop device notifications whose toast the user dismissed
    pub async fn toast_history_changed(&self) -> Result<()> {
        let displayed = self.inner.surface.displayed();
        let commands = self
            .inner
            .dispatcher
            .lock()
            .sync_dismissed(&displayed, self.is_forwarding());

        for command in commands {
            self.send(command).await?;
        }
        Ok(())
    }

    // ==================== Device messages ====================

    /// Handle one message from the device
    pub async fn handle_inbound(&self, message: InboundMessage) -> Result<()> {
        let outcome = self
            .inner
            .dispatcher
            .lock()
            .handle_inbound(message, self.inner.surface.as_ref());

        match outcome {
            InboundOutcome::RemoveHost { id, key } => self.remove_numeric_key(id, &key).await,
            _ => Ok(()),
        }
    }

    /// Remove a numeric key as a host notification, falling back to the
    /// device notification of the same key
    ///
    /// The host path counts as failed when the source cannot remove the id,
    /// or when the id is not a tracked host notification but a device
    /// notification with that key is shown.
    async fn remove_numeric_key(&self, id: u32, key: &str) -> Result<()> {
        let tracked = self
            .inner
            .engine
            .lock()
            .await
            .reconciler
            .tracked_ids()
            .contains(&id);
        let shown = self.inner.dispatcher.lock().find(key).is_some();

        if tracked || !shown {
            match self.inner.source.remove(id) {
                Ok(()) => {
                    debug!(id, "Device dismissed host notification");
                    self.reconcile_now().await?;
                    return Ok(());
                }
                Err(e) => warn!(id, "Failed to remove host notification: {}", e),
            }
        }

        self.inner
            .dispatcher
            .lock()
            .withdraw(key, self.inner.surface.as_ref());
        Ok(())
    }

    /// Snapshot of the device notifications currently shown
    pub fn remote_notifications(&self) -> Vec<crate::dispatch::RemoteNotification> {
        self.inner.dispatcher.lock().remote().to_vec()
    }

    /// Ids of the host notifications as of the last pass
    pub async fn tracked_ids(&self) -> Vec<u32> {
        self.inner.engine.lock().await.reconciler.tracked_ids()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("connected", &self.is_connected())
            .field("forwarding", &self.is_forwarding())
            .finish_non_exhaustive()
    }
}
