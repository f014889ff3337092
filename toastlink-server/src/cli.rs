//! Command-line argument parsing for the toastlink daemon
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

use toastlink_server::config::{AppConfig, ConfigLoader};
use toastlink_utils::Result;

/// toastlink - mirror host notifications to a paired device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file
    ///
    /// Defaults to `$XDG_CONFIG_HOME/toastlink/config.toml`; a missing
    /// default file means built-in defaults.
    #[arg(long, short = 'c', env = "TOASTLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to accept the device on (overrides transport.listen_addr)
    ///
    /// Example: 0.0.0.0:7878
    #[arg(long, short = 'l', env = "TOASTLINK_LISTEN")]
    pub listen: Option<String>,

    /// Notification snapshot file (overrides source.snapshot_file)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load the configuration, apply overrides, then validate the result
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = ConfigLoader::load_optional(self.config.as_deref())?;
        self.apply(&mut config);
        ConfigLoader::validate(&config)?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(listen) = &self.listen {
            config.transport.listen_addr = listen.clone();
        }
        if let Some(snapshot) = &self.snapshot {
            config.source.snapshot_file = Some(snapshot.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["toastlink-server"]);
        assert!(args.config.is_none());
        assert!(args.listen.is_none());
        assert!(args.snapshot.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_verbosity_counts() {
        let args = Args::parse_from(["toastlink-server", "-vvv"]);
        assert_eq!(args.verbose, 3);
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "toastlink-server",
            "--listen",
            "0.0.0.0:9000",
            "--snapshot",
            "/tmp/snap.json",
        ]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.transport.listen_addr, "0.0.0.0:9000");
        assert_eq!(
            config.source.resolved_snapshot_file(),
            PathBuf::from("/tmp/snap.json")
        );
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let args = Args::parse_from(["toastlink-server", "--config", "/etc/toastlink.toml"]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.transport.listen_addr, "127.0.0.1:7878");
        assert_eq!(args.config, Some(PathBuf::from("/etc/toastlink.toml")));
    }

    // ==================== Loading ====================

    fn config_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transport]\nlisten_addr = \"127.0.0.1:9100\"\n").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);

        let args = Args::parse_from(["toastlink-server", "-c", &path, "-l", "0.0.0.0:9200"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.transport.listen_addr, "0.0.0.0:9200");
    }

    #[test]
    fn test_load_config_validates_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir);

        let args = Args::parse_from(["toastlink-server", "-c", &path, "--listen", ""]);
        let err = args.load_config().unwrap_err();
        assert!(err.to_string().contains("listen_addr"));
    }
}
