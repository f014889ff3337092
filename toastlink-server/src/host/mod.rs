//! Host-side collaborators of the bridge
//!
//! The bridge never talks to the host notification system directly. It
//! reads snapshots through a [`SnapshotSource`] and displays device
//! notifications through a [`ToastSurface`].

mod file_source;
mod log_surface;
mod watcher;

pub use file_source::FileSnapshotSource;
pub use log_surface::LogToastSurface;
pub use watcher::SnapshotWatcher;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use toastlink_utils::Result;

use crate::dispatch::Toast;

/// Title used when a notification carries no text
pub const NO_TITLE: &str = "No title";

/// A host notification as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformNotification {
    pub id: u32,
    /// Identity of the app that raised it
    pub app_id: String,
    /// Package family, compared against the bridge's own
    pub package_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_display_name: Option<String>,
    /// Text elements of the generic binding; `None` when there is none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    /// Image file for the app icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<PathBuf>,
}

impl PlatformNotification {
    pub fn new(id: u32, app_id: impl Into<String>, package_family: impl Into<String>) -> Self {
        Self {
            id,
            app_id: app_id.into(),
            package_family: package_family.into(),
            app_display_name: None,
            text: None,
            icon_path: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.app_display_name = Some(name.into());
        self
    }

    pub fn with_text<I, S>(mut self, text: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text = Some(text.into_iter().map(Into::into).collect());
        self
    }

    /// Title and body: the first text element, then the rest joined by
    /// newlines
    pub fn title_and_body(&self) -> (String, String) {
        match self.text.as_deref() {
            Some([title, rest @ ..]) => (title.clone(), rest.join("\n")),
            _ => (NO_TITLE.to_string(), String::new()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.app_display_name.as_deref().unwrap_or("")
    }
}

/// Lists and dismisses host notifications
pub trait SnapshotSource: Send + Sync {
    /// Current notifications, newest first
    fn list(&self) -> Result<Vec<PlatformNotification>>;

    /// Dismiss a host notification (best-effort)
    fn remove(&self, id: u32) -> Result<()>;

    /// Package family of the bridge itself
    fn package_family(&self) -> &str;

    /// Icon image of the app behind `notification`, if it can be fetched
    fn icon(&self, notification: &PlatformNotification) -> Option<Vec<u8>>;
}

/// Displays device notifications locally
pub trait ToastSurface: Send + Sync {
    fn show(&self, toast: &Toast);

    /// Withdraw the toast tagged `tag` if it is still displayed
    fn withdraw(&self, tag: u64);

    /// Tags of the toasts still displayed
    fn displayed(&self) -> Vec<u64>;

    fn clear(&self);
}
