//! Snapshot reconciliation
//!
//! The host only tells us which notifications exist right now. The
//! [`Reconciler`] remembers the previous snapshot, in order, and turns the
//! difference into `Remove`, `Move` and `Add` events for the device.

use std::collections::HashSet;

use tracing::{debug, trace};

use toastlink_protocol::OutboundMessage;
use toastlink_utils::Result;

use crate::directory::{AppDirectory, AppDirectoryEntry};
use crate::host::{PlatformNotification, SnapshotSource};

/// A host notification as of the last reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedNotification {
    pub id: u32,
    pub app_id: String,
    pub package_family: String,
    pub title: String,
    pub body: String,
}

impl TrackedNotification {
    fn from_platform(notification: &PlatformNotification) -> Self {
        let (title, body) = notification.title_and_body();
        Self {
            id: notification.id,
            app_id: notification.app_id.clone(),
            package_family: notification.package_family.clone(),
            title,
            body,
        }
    }
}

/// Ordered view of the host notifications, newest first
#[derive(Debug, Default)]
pub struct Reconciler {
    tracked: Vec<TrackedNotification>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> &[TrackedNotification] {
        &self.tracked
    }

    /// Ids in tracked order
    pub fn tracked_ids(&self) -> Vec<u32> {
        self.tracked.iter().map(|n| n.id).collect()
    }

    /// Forget everything, so the next pass reports every notification as new
    pub fn reset(&mut self) {
        self.tracked.clear();
    }

    /// Bring the tracked order in line with `snapshot` and return the events
    /// for the device
    ///
    /// Removals come first, then moves and additions in snapshot order. Only
    /// the first occurrence of an id counts. Apps seen for the first time
    /// are added to `directory`; if that fails the pass is abandoned and the
    /// tracked state is left as it was.
    pub fn reconcile(
        &mut self,
        snapshot: &[PlatformNotification],
        directory: &mut AppDirectory,
        source: &dyn SnapshotSource,
        forwarding: bool,
    ) -> Result<Vec<OutboundMessage>> {
        let own_family = source.package_family();
        let is_own = |family: &str| family == own_family;

        let mut seen = HashSet::with_capacity(snapshot.len());
        let snapshot: Vec<&PlatformNotification> =
            snapshot.iter().filter(|n| seen.insert(n.id)).collect();

        let mut next = self.tracked.clone();
        let mut events = Vec::new();

        // Removal
        next.retain(|tracked| {
            if seen.contains(&tracked.id) {
                return true;
            }
            trace!(id = tracked.id, "Notification gone");
            if forwarding && !is_own(&tracked.package_family) {
                events.push(OutboundMessage::remove(tracked.id));
            }
            false
        });

        // Insert / move
        for (index, notification) in snapshot.iter().enumerate() {
            if next.get(index).map(|t| t.id) == Some(notification.id) {
                continue;
            }

            if let Some(position) = next.iter().position(|t| t.id == notification.id) {
                let tracked = next.remove(position);
                next.insert(index, tracked);
                trace!(id = notification.id, from = position, to = index, "Notification moved");
                if forwarding && !is_own(&notification.package_family) {
                    events.push(OutboundMessage::moved(notification.id));
                }
                continue;
            }

            let own = is_own(&notification.package_family);
            if !own && !directory.contains(&notification.app_id) {
                let icon = source.icon(notification).unwrap_or_default();
                directory.upsert(AppDirectoryEntry::new(
                    notification.app_id.clone(),
                    notification.display_name(),
                    icon,
                ))?;
            }

            let tracked = TrackedNotification::from_platform(notification);
            trace!(id = tracked.id, index, "Notification added");
            if forwarding && !own && directory.is_allowed(&notification.app_id) {
                events.push(OutboundMessage::add(
                    tracked.id,
                    notification.display_name(),
                    tracked.title.clone(),
                    tracked.body.clone(),
                ));
            }
            next.insert(index, tracked);
        }

        self.tracked = next;
        if !events.is_empty() {
            debug!(
                tracked = self.tracked.len(),
                events = events.len(),
                "Reconciled snapshot"
            );
        }
        Ok(events)
    }
}
