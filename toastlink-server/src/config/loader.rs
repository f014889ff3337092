//! Configuration loader

use std::path::Path;

use toastlink_utils::{config_file, Result, ToastlinkError};

use super::AppConfig;

/// Shortest accepted drain period
const MIN_DRAIN_INTERVAL_MS: u64 = 10;

/// Longest accepted drain period
const MAX_DRAIN_INTERVAL_MS: u64 = 10_000;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(ToastlinkError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ToastlinkError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| ToastlinkError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        let interval = config.outbound.drain_interval_ms;
        if !(MIN_DRAIN_INTERVAL_MS..=MAX_DRAIN_INTERVAL_MS).contains(&interval) {
            return Err(ToastlinkError::config(format!(
                "drain_interval_ms must be between {} and {}",
                MIN_DRAIN_INTERVAL_MS, MAX_DRAIN_INTERVAL_MS
            )));
        }

        if config.transport.max_frame_size == 0
            || config.transport.max_frame_size > u32::MAX as usize
        {
            return Err(ToastlinkError::config(
                "max_frame_size must fit a u32 length prefix and be non-zero",
            ));
        }

        if config.transport.listen_addr.trim().is_empty() {
            return Err(ToastlinkError::config("listen_addr must not be empty"));
        }

        if config.bridge.self_package_family.is_empty() {
            return Err(ToastlinkError::config(
                "self_package_family must not be empty",
            ));
        }

        Ok(())
    }

    /// Load from an explicit path or the default location
    ///
    /// Not validated; callers layer their overrides first.
    pub fn load_optional(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG_TOML;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
            [outbound]
            drain_interval_ms = 1000

            [transport]
            listen_addr = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.outbound.drain_interval_ms, 1000);
        assert_eq!(config.transport.listen_addr, "0.0.0.0:9000");
        // Untouched sections keep their defaults
        assert!(config.bridge.forwarding);
        assert!(config.source.watch);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_from_path(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ToastlinkError::ConfigNotFound(_))));
    }

    #[test]
    fn test_default_config_toml_parses_and_validates() {
        let config = ConfigLoader::parse(DEFAULT_CONFIG_TOML, Path::new("default.toml")).unwrap();
        ConfigLoader::validate(&config).unwrap();
        assert_eq!(config.bridge.self_package_family, "toastlink");
        assert_eq!(config.outbound.drain_interval_ms, 500);
    }

    #[test]
    fn test_validate_drain_interval() {
        let mut config = AppConfig::default();
        config.outbound.drain_interval_ms = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.outbound.drain_interval_ms = 60_000;
        assert!(ConfigLoader::validate(&config).is_err());

        config.outbound.drain_interval_ms = 750;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_frame_size() {
        let mut config = AppConfig::default();
        config.transport.max_frame_size = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("test.toml"));
        assert!(matches!(result, Err(ToastlinkError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_directory_path_override() {
        let config = ConfigLoader::parse(
            "[directory]\npath = \"/srv/apps.bin\"\n",
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(
            config.directory.resolved_path(),
            std::path::PathBuf::from("/srv/apps.bin")
        );
    }
}
