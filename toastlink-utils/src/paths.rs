//! Path utilities for toastlink
//!
//! Handles XDG Base Directory specification compliance for config,
//! state and data directories.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application identifier for XDG directories
const APP_NAME: &str = "toastlink";

/// File name of the persisted app allow-list
pub const APP_DIRECTORY_FILE_NAME: &str = "notificationApps";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/toastlink` or `~/.config/toastlink`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/toastlink/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/toastlink` or `~/.local/state/toastlink`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the data directory
///
/// Location: `$XDG_DATA_HOME/toastlink` or `~/.local/share/toastlink`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(fallback_data_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/toastlink/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Get the default app allow-list file
///
/// Location: `$XDG_DATA_HOME/toastlink/notificationApps`
pub fn app_directory_file() -> PathBuf {
    data_dir().join(APP_DIRECTORY_FILE_NAME)
}

/// Get the default notification snapshot file read by the daemon
///
/// Location: `$XDG_STATE_HOME/toastlink/snapshot.json`
pub fn snapshot_file() -> PathBuf {
    state_dir().join("snapshot.json")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure all required directories exist
pub fn ensure_all_dirs() -> std::io::Result<()> {
    ensure_dir(&config_dir())?;
    ensure_dir(&state_dir())?;
    ensure_dir(&data_dir())?;
    ensure_dir(&log_dir())?;
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

fn fallback_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_contains_app_name() {
        assert!(config_dir().to_string_lossy().contains("toastlink"));
    }

    #[test]
    fn test_config_file_is_toml() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with(".toml"));
        assert!(path.starts_with(config_dir()));
    }

    #[test]
    fn test_log_dir_in_state_dir() {
        assert!(log_dir().starts_with(state_dir()));
    }

    #[test]
    fn test_app_directory_file_name() {
        let path = app_directory_file();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(APP_DIRECTORY_FILE_NAME)
        );
        assert!(path.starts_with(data_dir()));
    }

    #[test]
    fn test_snapshot_file_is_json() {
        assert!(snapshot_file().to_string_lossy().ends_with("snapshot.json"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Idempotent
        ensure_dir(&nested).unwrap();
    }
}
