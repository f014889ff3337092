//! Error types for toastlink
//!
//! Provides a unified error type used across all toastlink crates.

use std::path::PathBuf;

/// Main error type for toastlink operations
#[derive(Debug, thiserror::Error)]
pub enum ToastlinkError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Transport Errors ===

    #[error("Transport fault: {0}")]
    Transport(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("No peer connected")]
    NotConnected,

    #[error("Outbound channel closed")]
    ChannelClosed,

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // === Directory Errors ===

    #[error("App directory error: {0}")]
    Directory(String),

    // === Host Errors ===

    #[error("Snapshot source error: {0}")]
    Source(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToastlinkError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    /// Create a snapshot source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error ends the bridge session
    ///
    /// Transport faults are never retried inside a session; reconnecting
    /// is up to whoever accepts the next connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionClosed | Self::ChannelClosed
        )
    }
}

/// Result type alias using ToastlinkError
pub type Result<T> = std::result::Result<T, ToastlinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ToastlinkError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ToastlinkError::FileRead {
            path: PathBuf::from("/var/lib/toastlink/notificationApps"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("notificationApps"));
    }

    #[test]
    fn test_error_display_transport() {
        let err = ToastlinkError::transport("short frame: expected 12 bytes");
        assert_eq!(
            err.to_string(),
            "Transport fault: short frame: expected 12 bytes"
        );
    }

    #[test]
    fn test_error_display_connection_closed() {
        assert_eq!(
            ToastlinkError::ConnectionClosed.to_string(),
            "Connection closed by peer"
        );
    }

    #[test]
    fn test_error_display_not_connected() {
        assert_eq!(ToastlinkError::NotConnected.to_string(), "No peer connected");
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = ToastlinkError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/toastlink/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_error_display_directory() {
        let err = ToastlinkError::directory("store unavailable");
        assert_eq!(err.to_string(), "App directory error: store unavailable");
    }

    // ==================== Fatality Tests ====================

    #[test]
    fn test_transport_errors_are_fatal() {
        assert!(ToastlinkError::transport("reset").is_fatal());
        assert!(ToastlinkError::ConnectionClosed.is_fatal());
        assert!(ToastlinkError::ChannelClosed.is_fatal());
    }

    #[test]
    fn test_other_errors_are_not_fatal() {
        let non_fatal = [
            ToastlinkError::config("bad"),
            ToastlinkError::directory("bad"),
            ToastlinkError::source("bad"),
            ToastlinkError::internal("bad"),
            ToastlinkError::NotConnected,
        ];

        for err in non_fatal {
            assert!(!err.is_fatal(), "Expected {:?} to NOT be fatal", err);
        }
    }

    // ==================== From Trait Tests ====================

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ToastlinkError = io_err.into();
        assert!(matches!(err, ToastlinkError::Io(_)));
    }
}
