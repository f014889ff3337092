//! Device key naming convention
//!
//! Keys of device notifications are opaque strings chosen by the device,
//! except for synthetic events the device raises itself (text messages and
//! incoming calls). Those keys start with [`DEVICE_KEY_PREFIX`] followed by
//! the sender's number and end with a category suffix, e.g. `+4915112345sms`.

/// Prefix marking a device-originated event key
pub const DEVICE_KEY_PREFIX: char = '+';

/// Suffix of text message keys
pub const SMS_KEY_SUFFIX: &str = "sms";

/// Suffix of incoming call keys
pub const CALL_KEY_SUFFIX: &str = "call";

/// Classification of a device key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A notification raised by an app on the device
    App,
    /// A text message; the key identifies the sender
    Sms,
    /// An incoming call; the key identifies the caller
    Call,
    /// Device-originated with an unrecognized suffix
    Device,
}

impl KeyKind {
    /// Whether the user can reply to the sender behind this key
    pub fn accepts_reply(self) -> bool {
        !matches!(self, Self::App)
    }
}

/// Check whether a key names a device-originated event
pub fn is_device_key(key: &str) -> bool {
    key.starts_with(DEVICE_KEY_PREFIX)
}

/// Classify a key by prefix and suffix
pub fn classify_key(key: &str) -> KeyKind {
    if !is_device_key(key) {
        KeyKind::App
    } else if key.ends_with(SMS_KEY_SUFFIX) {
        KeyKind::Sms
    } else if key.ends_with(CALL_KEY_SUFFIX) {
        KeyKind::Call
    } else {
        KeyKind::Device
    }
}
