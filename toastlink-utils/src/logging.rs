//! Logging infrastructure for toastlink
//!
//! Provides unified logging setup using the tracing ecosystem.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, Result, ToastlinkError};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TOASTLINK_LOG";

/// Daemon filter: bridge crates at info, dependencies only when they warn
pub const DAEMON_FILTER: &str = "warn,toastlink_server=info,toastlink_protocol=info";

/// Bridge crates whose level `-v` raises
const BRIDGE_TARGETS: [&str; 3] = ["toastlink_server", "toastlink_protocol", "toastlink_utils"];

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    File,
    /// Stderr plus the bridge log file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// `EnvFilter` directives
    pub filter: String,
    /// Log span open/close; the daemon's only span is a device session, so
    /// this marks connects and disconnects
    pub span_events: bool,
    pub file_line: bool,
    /// Log file name under the log dir (defaults to "bridge.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Config for the bridge daemon
    ///
    /// `TOASTLINK_LOG` replaces [`DAEMON_FILTER`] when set.
    pub fn daemon() -> Self {
        Self {
            output: LogOutput::Both,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| DAEMON_FILTER.into()),
            span_events: true,
            file_line: false,
            file_name: None,
        }
    }

    /// Raise the bridge crates to debug (1) or trace (2+)
    ///
    /// Dependencies stay at warn. Zero keeps the current filter.
    pub fn verbosity(mut self, level: u8) -> Self {
        let level = match level {
            0 => return self,
            1 => "debug",
            _ => "trace",
        };
        let mut filter = String::from("warn");
        for target in BRIDGE_TARGETS {
            filter.push_str(&format!(",{}={}", target, level));
        }
        self.filter = filter;
        self.file_line = true;
        self
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ToastlinkError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    let file_name = config.file_name.as_deref().unwrap_or("bridge.log");

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| ToastlinkError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(file_name)?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| ToastlinkError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(file_name)?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| ToastlinkError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

fn open_log_file(file_name: &str) -> Result<std::fs::File> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|e| ToastlinkError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| ToastlinkError::FileWrite {
            path: log_path,
            source: e,
        })
}
