//! Inbound command handling and toast bookkeeping
//!
//! The dispatcher keeps one [`RemoteNotification`] per device key and the
//! toast that shows it. Inbound removals with a numeric key are handed back
//! to the caller first, since they may name a host notification and that
//! needs the snapshot source and a reconciliation pass. The caller falls
//! back to [`CommandDispatcher::withdraw`] when the host removal fails.

mod toast;

pub use toast::{
    RemoteCategory, Toast, ToastAction, ToastActivation, ToastHeader, ToastScenario, CALL_BODY,
};

use tracing::{debug, info};

use toastlink_protocol::{is_device_key, InboundAction, InboundMessage, OutboundMessage};

use crate::host::ToastSurface;

/// A device notification displayed locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNotification {
    /// Tag of the local toast
    pub local_id: u64,
    pub key: String,
    pub title: String,
    pub body: String,
    pub app_name: String,
    pub package_name: String,
}

/// What handling an inbound message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A toast was shown or refreshed
    Shown { local_id: u64 },
    /// A device notification was dropped along with its toast
    Withdrawn { local_id: u64 },
    /// The key may name a host notification; the caller tries removing it
    /// from the source and otherwise withdraws the device entry by `key`
    RemoveHost { id: u32, key: String },
    /// Nothing matched the key
    Ignored,
}

/// Tracks device notifications and turns toast interaction into commands
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    remote: Vec<RemoteNotification>,
    next_local_id: u64,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a decoded inbound message
    pub fn handle_inbound(
        &mut self,
        message: InboundMessage,
        surface: &dyn ToastSurface,
    ) -> InboundOutcome {
        match message.action {
            InboundAction::Remove => self.handle_remove(&message.key, surface),
            InboundAction::Add => self.handle_add(message, surface),
        }
    }

    fn handle_remove(&mut self, key: &str, surface: &dyn ToastSurface) -> InboundOutcome {
        if let Some(id) = host_notification_id(key) {
            return InboundOutcome::RemoveHost {
                id,
                key: key.to_string(),
            };
        }

        self.withdraw(key, surface)
    }

    /// Drop the device notification with `key` and its toast
    pub fn withdraw(&mut self, key: &str, surface: &dyn ToastSurface) -> InboundOutcome {
        match self.remote.iter().position(|n| n.key == key) {
            Some(index) => {
                let removed = self.remote.remove(index);
                surface.withdraw(removed.local_id);
                debug!(key, local_id = removed.local_id, "Device notification removed");
                InboundOutcome::Withdrawn {
                    local_id: removed.local_id,
                }
            }
            None => {
                debug!(key, "Removal for unknown device notification");
                InboundOutcome::Ignored
            }
        }
    }

    fn handle_add(&mut self, message: InboundMessage, surface: &dyn ToastSurface) -> InboundOutcome {
        let local_id = match self.remote.iter_mut().find(|n| n.key == message.key) {
            Some(existing) => {
                existing.title = message.title.clone();
                existing.body = message.body.clone();
                existing.app_name = message.app_name.clone();
                existing.package_name = message.package_name.clone();
                existing.local_id
            }
            None => {
                let local_id = self.next_local_id;
                self.next_local_id += 1;
                self.remote.push(RemoteNotification {
                    local_id,
                    key: message.key.clone(),
                    title: message.title.clone(),
                    body: message.body.clone(),
                    app_name: message.app_name.clone(),
                    package_name: message.package_name.clone(),
                });
                local_id
            }
        };

        let toast = Toast::render(local_id, &message);
        surface.show(&toast);
        info!(key = %message.key, local_id, "Showing device notification");

        InboundOutcome::Shown { local_id }
    }

    /// Drop device notifications whose toast is gone
    ///
    /// Returns the removals to send so the device dismisses them as well;
    /// none when not forwarding.
    pub fn sync_dismissed(&mut self, displayed: &[u64], forwarding: bool) -> Vec<OutboundMessage> {
        let mut commands = Vec::new();

        self.remote.retain(|n| {
            if displayed.contains(&n.local_id) {
                return true;
            }
            debug!(key = %n.key, local_id = n.local_id, "Toast dismissed locally");
            if forwarding {
                commands.push(OutboundMessage::remove(&n.key));
            }
            false
        });

        commands
    }

    /// Forget every device notification and clear their toasts
    pub fn clear(&mut self, surface: &dyn ToastSurface) {
        self.remote.clear();
        surface.clear();
    }

    pub fn remote(&self) -> &[RemoteNotification] {
        &self.remote
    }

    pub fn find(&self, key: &str) -> Option<&RemoteNotification> {
        self.remote.iter().find(|n| n.key == key)
    }
}

/// Numeric keys may be host notification ids
fn host_notification_id(key: &str) -> Option<u32> {
    if is_device_key(key) {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LogToastSurface;

    fn sms(key: &str, body: &str) -> InboundMessage {
        InboundMessage::add(key, "Bob", body)
    }

    // ==================== Inbound Add ====================

    #[test]
    fn test_add_assigns_monotonic_ids() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        let first = dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        let second = dispatcher.handle_inbound(sms("+2sms", "b"), &surface);

        assert_eq!(first, InboundOutcome::Shown { local_id: 0 });
        assert_eq!(second, InboundOutcome::Shown { local_id: 1 });
        assert_eq!(surface.displayed(), vec![0, 1]);
    }

    #[test]
    fn test_add_same_key_updates_in_place() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("+1sms", "first"), &surface);
        let outcome = dispatcher.handle_inbound(sms("+1sms", "second"), &surface);

        assert_eq!(outcome, InboundOutcome::Shown { local_id: 0 });
        assert_eq!(dispatcher.remote().len(), 1);
        assert_eq!(dispatcher.find("+1sms").unwrap().body, "second");
        assert_eq!(surface.get(0).unwrap().body, "second");
    }

    #[test]
    fn test_add_generic_keeps_app() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        let message = InboundMessage::add("0|com.chat|7", "Alice", "lunch?")
            .with_app("Chat", "com.chat")
            .with_content_intent("intent");
        dispatcher.handle_inbound(message, &surface);

        let remote = dispatcher.find("0|com.chat|7").unwrap();
        assert_eq!(remote.app_name, "Chat");
        assert_eq!(remote.package_name, "com.chat");
        assert!(surface.get(0).unwrap().has_action(ToastAction::Open));
    }

    // ==================== Inbound Remove ====================

    #[test]
    fn test_remove_numeric_key_targets_host() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        let outcome = dispatcher.handle_inbound(InboundMessage::remove("42"), &surface);
        assert_eq!(
            outcome,
            InboundOutcome::RemoveHost {
                id: 42,
                key: "42".into()
            }
        );
    }

    #[test]
    fn test_withdraw_numeric_device_key() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("77", "hi"), &surface);
        let outcome = dispatcher.handle_inbound(InboundMessage::remove("77"), &surface);
        assert!(matches!(outcome, InboundOutcome::RemoveHost { id: 77, .. }));
        assert_eq!(surface.displayed(), vec![0]);

        let outcome = dispatcher.withdraw("77", &surface);
        assert_eq!(outcome, InboundOutcome::Withdrawn { local_id: 0 });
        assert!(surface.is_empty());
        assert!(dispatcher.find("77").is_none());
    }

    #[test]
    fn test_remove_device_key_withdraws_toast() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        dispatcher.handle_inbound(sms("+2sms", "b"), &surface);

        let outcome = dispatcher.handle_inbound(InboundMessage::remove("+1sms"), &surface);
        assert_eq!(outcome, InboundOutcome::Withdrawn { local_id: 0 });
        assert_eq!(surface.displayed(), vec![1]);
        assert!(dispatcher.find("+1sms").is_none());
    }

    #[test]
    fn test_remove_unknown_key_is_ignored() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        let outcome = dispatcher.handle_inbound(InboundMessage::remove("0|com.chat|7"), &surface);
        assert_eq!(outcome, InboundOutcome::Ignored);
    }

    #[test]
    fn test_host_notification_id() {
        assert_eq!(host_notification_id("7"), Some(7));
        assert_eq!(host_notification_id("+7"), None);
        assert_eq!(host_notification_id("4294967296"), None);
        assert_eq!(host_notification_id("0|com.chat|7"), None);
    }

    // ==================== Dismissal sync ====================

    #[test]
    fn test_sync_dismissed_emits_removals() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        dispatcher.handle_inbound(sms("+2call", "b"), &surface);
        surface.withdraw(1);

        let commands = dispatcher.sync_dismissed(&surface.displayed(), true);
        assert_eq!(commands, vec![OutboundMessage::remove("+2call")]);
        assert!(dispatcher.find("+2call").is_none());
        assert!(dispatcher.find("+1sms").is_some());
    }

    #[test]
    fn test_sync_dismissed_silent_when_not_forwarding() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        surface.clear();

        assert!(dispatcher.sync_dismissed(&surface.displayed(), false).is_empty());
        assert!(dispatcher.remote().is_empty());
    }

    #[test]
    fn test_clear() {
        let surface = LogToastSurface::new();
        let mut dispatcher = CommandDispatcher::new();

        dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        dispatcher.clear(&surface);

        assert!(dispatcher.remote().is_empty());
        assert!(surface.is_empty());

        // Ids keep increasing across clears
        let outcome = dispatcher.handle_inbound(sms("+1sms", "a"), &surface);
        assert_eq!(outcome, InboundOutcome::Shown { local_id: 1 });
    }
}
