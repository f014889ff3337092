//! Configuration schema structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use toastlink_protocol::MAX_FRAME_SIZE;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    pub transport: TransportConfig,
    pub outbound: OutboundConfig,
    pub directory: DirectoryConfig,
    pub source: SourceConfig,
}

/// Bridge behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Package family of the bridge's own notifications (never mirrored)
    pub self_package_family: String,
    /// Mirror host notifications while a peer is connected
    pub forwarding: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            self_package_family: "toastlink".into(),
            forwarding: true,
        }
    }
}

/// Link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Address the daemon accepts its single peer on
    pub listen_addr: String,
    /// Largest frame payload accepted or sent, in bytes
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".into(),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Outbound mailbox settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Period of the drain loop in milliseconds
    pub drain_interval_ms: u64,
}

impl OutboundConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 500,
        }
    }
}

/// App allow-list settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Allow-list file (defaults to the XDG data dir)
    pub path: Option<PathBuf>,
}

impl DirectoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(toastlink_utils::app_directory_file)
    }
}

/// Notification snapshot source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON snapshot file published by the host (defaults to the XDG state dir)
    pub snapshot_file: Option<PathBuf>,
    /// Reconcile whenever the snapshot file changes
    pub watch: bool,
}

impl SourceConfig {
    pub fn resolved_snapshot_file(&self) -> PathBuf {
        self.snapshot_file
            .clone()
            .unwrap_or_else(toastlink_utils::snapshot_file)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            snapshot_file: None,
            watch: true,
        }
    }
}
