//! toastlink-protocol: Wire definitions for the notification bridge
//!
//! This crate defines the messages exchanged between the host bridge and the
//! paired device, their textual payload encodings, the key naming convention
//! for device-originated events, and the length-prefixed framing used on the
//! byte stream in both directions.

pub mod codec;
pub mod keys;
pub mod messages;

// Re-export main types at crate root
pub use codec::{CodecError, HostCodec, InboundFrame, OutboundFrame, PeerCodec, MAX_FRAME_SIZE};
pub use keys::{classify_key, is_device_key, KeyKind, DEVICE_KEY_PREFIX};
pub use messages::{
    InboundAction, InboundMessage, MessageError, OutboundMessage, OutboundType,
    INBOUND_FIELD_COUNT,
};
