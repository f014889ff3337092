//! toastlink-utils: Common utilities shared across toastlink crates
//!
//! This crate provides:
//! - Unified error types ([`ToastlinkError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{Result, ToastlinkError};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};

// Re-export commonly used path functions
pub use paths::{
    app_directory_file, config_dir, config_file, data_dir, ensure_all_dirs, ensure_dir, log_dir,
    snapshot_file, state_dir,
};
