//! Snapshot source backed by a JSON file
//!
//! The host publishes its current notification list as a JSON array of
//! [`PlatformNotification`] (newest first). Dismissing a notification
//! rewrites the file without it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use toastlink_utils::{Result, ToastlinkError};

use super::{PlatformNotification, SnapshotSource};

pub struct FileSnapshotSource {
    path: PathBuf,
    package_family: String,
    /// Serializes read-modify-write in `remove`
    write_lock: Mutex<()>,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>, package_family: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package_family: package_family.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<PlatformNotification>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ToastlinkError::FileRead {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            ToastlinkError::source(format!("{}: {}", self.path.display(), e))
        })
    }

    fn write(&self, snapshot: &[PlatformNotification]) -> Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| ToastlinkError::source(format!("Failed to encode snapshot: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, data).map_err(|e| ToastlinkError::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| ToastlinkError::FileWrite {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn list(&self) -> Result<Vec<PlatformNotification>> {
        self.read()
    }

    fn remove(&self, id: u32) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut snapshot = self.read()?;
        let before = snapshot.len();
        snapshot.retain(|n| n.id != id);

        if snapshot.len() == before {
            debug!(id, "Notification already gone from snapshot");
            return Ok(());
        }

        self.write(&snapshot)?;
        debug!(id, "Removed notification from snapshot");
        Ok(())
    }

    fn package_family(&self) -> &str {
        &self.package_family
    }

    fn icon(&self, notification: &PlatformNotification) -> Option<Vec<u8>> {
        let path = notification.icon_path.as_ref()?;
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(app = %notification.app_id, "Failed to read icon {}: {}", path.display(), e);
                None
            }
        }
    }
}
