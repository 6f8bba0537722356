//! Logging configuration and initialization
//!
//! Console output (compact or JSON) and optional file output, all through
//! tracing.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "HUE_KEY_LOG";

/// Environment variable selecting the log format ("json" or anything else)
pub const LOG_FORMAT_ENV: &str = "HUE_KEY_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to `file_path` as well
    pub file_enabled: bool,
    /// Log file location (default: `hue-key.log` in the working directory)
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when no environment override is set (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Console logging at the given verbosity (0 = info, 1 = debug, 2+ = trace)
    pub fn with_verbosity(verbose: u8) -> Self {
        let default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            default_level: default_level.to_string(),
            ..Self::default()
        }
    }

    /// Also write logs to `path`
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_enabled = true;
        self.file_path = Some(path.into());
        self
    }
}

/// Initialize the global subscriber
///
/// Returns a guard that must be held until exit so file output is flushed.
///
/// # Environment Variables
///
/// - `HUE_KEY_LOG`: log filter (e.g. "debug", "info,hue_key::keying=trace"),
///   falling back to `RUST_LOG`
/// - `HUE_KEY_LOG_FORMAT`: set to "json" for JSON output
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(config.json_format);

    let mut file_guard: Option<WorkerGuard> = None;
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.file_enabled {
        let log_path = config
            .file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("hue-key.log"));
        let file = std::fs::File::create(&log_path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        if config.console_enabled {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact();
            subscriber.with(file_layer).with(console_layer).try_init()?;
        } else {
            subscriber.with(file_layer).try_init()?;
        }
    } else if config.console_enabled {
        if use_json {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            subscriber.with(json_layer).try_init()?;
        } else {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact();
            subscriber.with(console_layer).try_init()?;
        }
    } else {
        subscriber.try_init()?;
    }

    tracing::info!(
        target: "hue_key",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
