//! # Logging Utilities
//!
//! Logging infrastructure for Ferros using `tracing`.
//!
//! Logs are written to stderr, so a command's own output on stdout (a
//! variables tree, a JSON listing) stays machine-readable. Optionally a copy
//! goes to a file through a non-blocking writer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferros_utils::{init_logging, LoggingConfig};
//!
//! // Keep the guard alive for as long as logs should be flushed to the file.
//! let _guard = init_logging(&LoggingConfig::from_env()).expect("Failed to initialize logging");
//!
//! tracing::info!("Inspector started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Filter directives (e.g., `RUST_LOG=debug`, `RUST_LOG=ferros_inspect=trace`)
//! - `FERROS_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `FERROS_LOG_FILE`: Optional path to a log file
//! - `FERROS_LOG_DIR`: Directory for a dated log file, used when `FERROS_LOG_FILE` is unset
//!
//! An explicit level (e.g. from a `--log-level` flag) takes precedence over
//! `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    /// Most verbose; includes every child pulled from a renderer
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// How to set up the global subscriber
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfig
{
    /// Overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read `FERROS_LOG_FORMAT`, `FERROS_LOG_FILE` and `FERROS_LOG_DIR`.
    ///
    /// Unknown formats fall back to pretty output. The level is left to
    /// `RUST_LOG`.
    pub fn from_env() -> Self
    {
        let format = env::var("FERROS_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let file = env::var_os("FERROS_LOG_FILE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::var_os("FERROS_LOG_DIR")
                    .filter(|dir| !dir.is_empty())
                    .map(|dir| dated_log_file(Path::new(&dir)))
            });
        Self {
            level: None,
            format,
            file,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self
    {
        self.file = Some(file.into());
        self
    }

    /// Filter for this configuration.
    ///
    /// Priority: explicit level, then `RUST_LOG`, then `info`.
    fn filter(&self) -> EnvFilter
    {
        if let Some(level) = self.level {
            return EnvFilter::new(Level::from(level).to_string());
        }
        match env::var("RUST_LOG") {
            Ok(directives) => EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
            Err(_) => EnvFilter::new(Level::INFO.to_string()),
        }
    }
}

/// Keeps the file writer alive; logs are flushed when it is dropped.
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file's directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let guard = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = match config.format {
                LogFormat::Pretty => fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_filter(config.filter())
                    .boxed(),
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(config.filter())
                    .boxed(),
            };
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .with_filter(config.filter())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_writer(io::stderr)
            .with_filter(config.filter())
            .boxed(),
    };

    layers.push(console_layer);

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(LoggingGuard { _file: guard })
}

/// Install a test-friendly subscriber that writes through the test harness.
///
/// Safe to call from many tests; only the first call installs anything.
pub fn init_test_logging()
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// `<dir>/<YYYY-MM-DD>-ferros.log`
pub fn dated_log_file(dir: &Path) -> PathBuf
{
    let today = Utc::now().format("%Y-%m-%d");
    dir.join(format!("{today}-ferros.log"))
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError>
{
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(LoggingError::FileError)?;
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?;
    // The date, if wanted, is already part of the name.
    let appender = tracing_appender::rolling::never(dir, name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Log directory could not be created
    #[error("Failed to prepare log file: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_levels()
    {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("dbg".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!(matches!("loud".parse::<LogLevel>(), Err(LoggingError::InvalidLevel(level)) if level == "loud"));
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert!(LogLevel::Error < LogLevel::Trace);
    }

    #[test]
    fn test_parse_formats()
    {
        assert_eq!("prod".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown log format: xml. Use 'pretty' or 'json'");
    }

    #[test]
    fn test_config_builders()
    {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_file("/tmp/ferros/inspect.log");
        assert_eq!(config.level, Some(LogLevel::Debug));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file.as_deref(), Some(Path::new("/tmp/ferros/inspect.log")));
    }

    #[test]
    fn test_dated_log_file()
    {
        let path = dated_log_file(Path::new("/var/log"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-ferros.log"));
        assert_eq!(name.len(), "YYYY-MM-DD-ferros.log".len());
        assert_eq!(path.parent(), Some(Path::new("/var/log")));
    }

    #[test]
    fn test_second_init_fails()
    {
        init_test_logging();
        let err = init_logging(&LoggingConfig::default()).unwrap_err();
        assert!(matches!(err, LoggingError::InitializationFailed(_)));
    }
}
