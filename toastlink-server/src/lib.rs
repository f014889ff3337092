//! toastlink-server: Notification bridge engine and daemon
//!
//! Mirrors the host's notifications to one paired device and turns the
//! device's commands back into host actions:
//!
//! - [`reconcile`] diffs notification snapshots into add/move/remove events
//! - [`directory`] keeps the persisted allow-list of source apps
//! - [`outbound`] is the single-slot mailbox and its drain loop
//! - [`dispatch`] handles device messages and toast interaction
//! - [`bridge`] ties them together for the [`session`] and the host layer

pub mod bridge;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod host;
pub mod outbound;
pub mod reconcile;
pub mod session;
pub mod tcp;

pub use bridge::Bridge;
pub use session::{serve, SessionOptions};
