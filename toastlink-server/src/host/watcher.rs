//! Snapshot file watcher driving reconciliation

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use tokio::sync::mpsc;

use toastlink_utils::{ensure_dir, Result, ToastlinkError};

use crate::bridge::Bridge;

/// Quiet period before a burst of writes counts as one change
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the snapshot file and reconciles whenever it changes
pub struct SnapshotWatcher {
    /// Snapshot file being watched
    path: PathBuf,
    /// Channel receiver for events
    rx: mpsc::UnboundedReceiver<Result<Vec<Event>>>,
    /// Debouncer handle (kept alive)
    _debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
}

impl SnapshotWatcher {
    /// Watch `path`; its parent directory is created if missing
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        ensure_dir(&dir).map_err(|e| ToastlinkError::FileWrite {
            path: dir.clone(),
            source: e,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            let events = result
                .map(|events| events.into_iter().map(|e| e.event).collect())
                .map_err(|errs| ToastlinkError::source(format!("Watch error: {:?}", errs)));
            let _ = tx.send(events);
        })
        .map_err(|e| ToastlinkError::source(format!("Failed to create watcher: {}", e)))?;

        // The file is replaced by rename, so watch its directory
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ToastlinkError::source(format!("Failed to watch: {}", e)))?;

        Ok(Self {
            path,
            rx,
            _debouncer: debouncer,
        })
    }

    /// Run until the watcher shuts down, reconciling once per change burst
    pub async fn run(mut self, bridge: Bridge) {
        tracing::info!("Snapshot watcher started for {:?}", self.path);

        while let Some(result) = self.rx.recv().await {
            match result {
                Ok(events) => {
                    if events.iter().any(|e| self.is_snapshot_change(e)) {
                        tracing::debug!("Snapshot changed, reconciling");
                        if let Err(e) = bridge.reconcile_now().await {
                            tracing::warn!("Reconciliation after snapshot change failed: {}", e);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Snapshot watch error: {}", e);
                }
            }
        }
    }

    /// Check if an event touches the snapshot file
    fn is_snapshot_change(&self, event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == self.path.file_name())
    }
}
