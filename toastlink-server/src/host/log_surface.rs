//! Toast surface that records toasts and logs them

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::info;

use crate::dispatch::Toast;

use super::ToastSurface;

/// Keeps displayed toasts in memory and reports them through `tracing`
#[derive(Debug, Default)]
pub struct LogToastSurface {
    displayed: Mutex<BTreeMap<u64, Toast>>,
}

impl LogToastSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The toast currently displayed under `tag`
    pub fn get(&self, tag: u64) -> Option<Toast> {
        self.displayed.lock().get(&tag).cloned()
    }

    /// Number of toasts currently displayed
    pub fn len(&self) -> usize {
        self.displayed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.displayed.lock().is_empty()
    }
}

impl ToastSurface for LogToastSurface {
    fn show(&self, toast: &Toast) {
        info!(
            tag = toast.tag,
            header = %toast.header.id,
            "{}: {} | {}",
            toast.attribution,
            toast.title,
            toast.body
        );
        self.displayed.lock().insert(toast.tag, toast.clone());
    }

    fn withdraw(&self, tag: u64) {
        if self.displayed.lock().remove(&tag).is_some() {
            info!(tag, "Toast withdrawn");
        }
    }

    fn displayed(&self) -> Vec<u64> {
        self.displayed.lock().keys().copied().collect()
    }

    fn clear(&self) {
        let mut displayed = self.displayed.lock();
        if !displayed.is_empty() {
            info!(count = displayed.len(), "Clearing toasts");
        }
        displayed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toastlink_protocol::InboundMessage;

    #[test]
    fn test_show_replaces_same_tag() {
        let surface = LogToastSurface::new();
        surface.show(&Toast::render(1, &InboundMessage::add("+1sms", "Bob", "one")));
        surface.show(&Toast::render(1, &InboundMessage::add("+1sms", "Bob", "two")));

        assert_eq!(surface.len(), 1);
        assert_eq!(surface.get(1).unwrap().body, "two");
    }

    #[test]
    fn test_withdraw_and_clear() {
        let surface = LogToastSurface::new();
        for tag in 0..3 {
            surface.show(&Toast::render(tag, &InboundMessage::add("k", "t", "b")));
        }

        surface.withdraw(1);
        surface.withdraw(7);
        assert_eq!(surface.displayed(), vec![0, 2]);

        surface.clear();
        assert!(surface.is_empty());
    }
}
