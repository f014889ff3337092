//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# toastlink configuration

[bridge]
# Package family of the bridge itself; its own notifications are never mirrored
self_package_family = "toastlink"
forwarding = true

[transport]
listen_addr = "127.0.0.1:7878"
max_frame_size = 16777216

[outbound]
drain_interval_ms = 500

[directory]
# path = "/home/user/.local/share/toastlink/notificationApps"

[source]
# snapshot_file = "/home/user/.local/state/toastlink/snapshot.json"
watch = true
"##;
