//! Logging setup on the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `QUILL_LOG`: Filter directive (like `RUST_LOG`), e.g., `quill_ui=debug`
//! - `QUILL_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `QUILL_LOG_DIR`: Directory for file logs (default `~/.quill/logs`)
//!
//! # Example
//!
//! ```no_run
//! use quill_core::logging::{self, LoggingConfig};
//!
//! let _guard = logging::init_logging(Some(LoggingConfig::default().with_level("debug")))?;
//! # Ok::<(), quill_core::Error>(())
//! ```

use crate::Error;
use crate::config::LoggingSection;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default length for [`preview_for_log`]
pub const LOG_PREVIEW_CHARS: usize = 80;

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    /// Parse a log format from a string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// Runtime logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter used when no environment filter is set
    pub level: String,
    /// Format from configuration; `QUILL_LOG_FORMAT` wins when set
    pub format: Option<LogFormat>,
    /// Directory for daily-rotated JSON logs, `None` disables file output
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: None, file_dir: None }
    }
}

impl From<LoggingSection> for LoggingConfig {
    fn from(section: LoggingSection) -> Self {
        let file_dir = if section.file { section.dir.or_else(default_log_dir) } else { None };
        Self { level: section.level, format: LogFormat::parse_str(&section.format), file_dir }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("QUILL_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Environment first, then configuration, then TTY detection
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("QUILL_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if let Some(format) = self.format {
            return format;
        }

        if Self::is_tty() { LogFormat::Pretty } else { LogFormat::Compact }
    }

    fn resolve_log_dir(&self) -> Option<PathBuf> {
        match env::var("QUILL_LOG_DIR") {
            Ok(dir) if self.file_dir.is_some() => Some(PathBuf::from(dir)),
            _ => self.file_dir.clone(),
        }
    }
}

/// `~/.quill/logs`
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".quill").join("logs"))
}

/// Initialize the global tracing subscriber.
///
/// Sets up an environment-based filter, formatted stderr output and, when a
/// log directory is configured, a daily-rotated JSON file. The returned guard
/// flushes the file writer on drop and must be held for the program's
/// lifetime.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let env_filter = config.build_env_filter();
    let format = config.detect_format();

    let (file_layer, guard) = match config.resolve_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = tracing_appender::rolling::daily(&log_dir, "quill.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().json().with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let registry = Registry::default().with(env_filter).with(file_layer);

    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(io::stderr)).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact().with_writer(io::stderr)).try_init(),
    };
    result.map_err(|e| Error::Other(format!("failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Shorten message text for log fields
pub fn preview_for_log(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.replace('\n', "\\n");
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}... ({} total chars)", head.replace('\n', "\\n"), total)
}

/// Sanitize file paths for logging (home directory shown as `~`).
pub fn sanitize_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }

    path.display().to_string()
}
