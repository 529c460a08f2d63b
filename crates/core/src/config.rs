use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::logging::LogFormat;

/// Accepted range for `render.coalesce_ms`
pub const COALESCE_MS_MIN: u64 = 1;
pub const COALESCE_MS_MAX: u64 = 2000;

/// Initial color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

impl ThemeChoice {
    pub const VALUES: &[ThemeChoice] = &[ThemeChoice::Dark, ThemeChoice::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeChoice::Dark => "dark",
            ThemeChoice::Light => "light",
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, ThemeChoice::Dark)
    }
}

impl std::fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThemeChoice {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dark" => Ok(ThemeChoice::Dark),
            "light" => Ok(ThemeChoice::Light),
            _ => Err(ConfigError::InvalidTheme(s.to_string()).into()),
        }
    }
}

/// When appended text is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Render the touched message right after each append (default)
    #[default]
    Immediate,
    /// Collect touched messages and render them once `coalesce_ms` elapses
    Coalesce,
}

impl UpdateMode {
    pub const VALUES: &[UpdateMode] = &[UpdateMode::Immediate, UpdateMode::Coalesce];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Immediate => "immediate",
            UpdateMode::Coalesce => "coalesce",
        }
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(UpdateMode::Immediate),
            "coalesce" => Ok(UpdateMode::Coalesce),
            _ => Err(ConfigError::InvalidUpdatePolicy(s.to_string()).into()),
        }
    }
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default)]
    pub theme: ThemeChoice,

    #[serde(default)]
    pub update_policy: UpdateMode,

    /// Coalescing window in milliseconds, used with `update_policy = "coalesce"`
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,

    /// Built-in syntect theme used on dark backgrounds
    #[serde(default = "default_dark_code_theme")]
    pub dark_code_theme: String,

    /// Built-in syntect theme used on light backgrounds
    #[serde(default = "default_light_code_theme")]
    pub light_code_theme: String,

    /// Optional `.tmTheme` file that overrides both built-in code themes
    #[serde(default)]
    pub code_theme_file: Option<PathBuf>,
}

fn default_coalesce_ms() -> u64 {
    100
}

fn default_dark_code_theme() -> String {
    "base16-ocean.dark".to_string()
}

fn default_light_code_theme() -> String {
    "InspiredGitHub".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: ThemeChoice::default(),
            update_policy: UpdateMode::default(),
            coalesce_ms: default_coalesce_ms(),
            dark_code_theme: default_dark_code_theme(),
            light_code_theme: default_light_code_theme(),
            code_theme_file: None,
        }
    }
}

impl RenderConfig {
    /// Coalescing window, `None` for immediate updates
    pub fn coalesce_window(&self) -> Option<Duration> {
        match self.update_policy {
            UpdateMode::Immediate => None,
            UpdateMode::Coalesce => Some(Duration::from_millis(self.coalesce_ms)),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter used when neither `QUILL_LOG` nor `RUST_LOG` is set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// stderr format: pretty, json or compact
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also write daily-rotated JSON logs
    #[serde(default)]
    pub file: bool,

    /// Directory for log files, defaults to `~/.quill/logs`
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: false, dir: None }
    }
}

/// Root configuration structure for quill.toml
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let ms = self.render.coalesce_ms;
        if !(COALESCE_MS_MIN..=COALESCE_MS_MAX).contains(&ms) {
            return Err(ConfigError::CoalesceOutOfRange { value: ms, min: COALESCE_MS_MIN, max: COALESCE_MS_MAX }.into());
        }

        if LogFormat::parse_str(&self.logging.format).is_none() {
            return Err(ConfigError::InvalidLogFormat(self.logging.format.clone()).into());
        }

        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# Quill Configuration Example
# Copy this file to quill.toml and customize as needed

[render]
# Initial color scheme: "dark" or "light"
theme = "dark"
# "immediate" renders after every append, "coalesce" batches touched messages
update_policy = "immediate"
# Coalescing window in milliseconds (1-2000)
coalesce_ms = 100
# Built-in code highlighting themes
dark_code_theme = "base16-ocean.dark"
light_code_theme = "InspiredGitHub"
# Optional .tmTheme file overriding both (falls back to built-ins if unreadable)
# code_theme_file = "/path/to/theme.tmTheme"

[logging]
# Filter used when QUILL_LOG / RUST_LOG are unset
level = "warn"
# stderr format: "pretty", "json" or "compact"
format = "pretty"
# Write daily-rotated JSON logs to `dir` (default ~/.quill/logs)
file = false
# dir = "/var/log/quill"
"#
    }
}
