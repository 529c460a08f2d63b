use thiserror::Error;

/// Result type alias for quill-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the transcript renderer
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Parse errors surfaced outside the literal fallback path
    #[error("parse error: {0}")]
    Parse(String),

    /// Failure while materializing one message
    #[error("render error: {0}")]
    Render(String),

    /// Transcript (de)serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Structural problems found while scanning a SEARCH/REPLACE directive.
///
/// These never reach callers of `append`; they are recorded on the parse
/// result and the owning message renders as literal text instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    /// A SEARCH marker was never followed by a divider
    #[error("expected ======= divider after <<<<<<< SEARCH (line {line})")]
    MissingDivider { line: usize },

    /// A divider was never followed by a REPLACE marker
    #[error("expected >>>>>>> REPLACE after ======= (line {line})")]
    MissingReplace { line: usize },

    /// No file name could be found for a directive
    #[error("missing file name for directive starting at line {line}")]
    MissingFilename { line: usize },
}

impl DirectiveError {
    /// 1-indexed line where the offending directive starts
    pub fn line(&self) -> usize {
        match self {
            Self::MissingDivider { line } | Self::MissingReplace { line } | Self::MissingFilename { line } => *line,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown theme name
    #[error("invalid theme: {0}")]
    InvalidTheme(String),

    /// Unknown update policy
    #[error("invalid update policy: {0}")]
    InvalidUpdatePolicy(String),

    /// Coalescing delay outside the accepted range
    #[error("coalesce_ms must be between {min} and {max}, got {value}")]
    CoalesceOutOfRange { value: u64, min: u64, max: u64 },

    /// Unknown log format
    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let io_err: Error = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        assert_eq!(io_err.to_string(), "I/O error: file not found");

        let parse_err = Error::Parse("bad fence".to_string());
        assert_eq!(parse_err.to_string(), "parse error: bad fence");

        let render_err = Error::Render("message 3".to_string());
        assert_eq!(render_err.to_string(), "render error: message 3");

        let other_err = Error::Other("something went wrong".to_string());
        assert_eq!(other_err.to_string(), "something went wrong");
    }

    #[test]
    fn test_directive_error_display() {
        let err = DirectiveError::MissingDivider { line: 4 };
        assert_eq!(err.to_string(), "expected ======= divider after <<<<<<< SEARCH (line 4)");
        assert_eq!(err.line(), 4);

        let err = DirectiveError::MissingReplace { line: 9 };
        assert!(err.to_string().contains("REPLACE"));
        assert_eq!(err.line(), 9);

        let err = DirectiveError::MissingFilename { line: 1 };
        assert!(err.to_string().contains("file name"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::CoalesceOutOfRange { value: 0, min: 1, max: 2000 };
        assert_eq!(err.to_string(), "coalesce_ms must be between 1 and 2000, got 0");

        let err: Error = ConfigError::InvalidTheme("sepia".to_string()).into();
        assert_eq!(err.to_string(), "configuration error: invalid theme: sepia");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: Error = io_err.into();
        assert_eq!(error.to_string(), "I/O error: denied");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let error: Error = json_err.into();
        assert!(error.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn test_result_type_alias() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(Error::Other("error".to_string()));
        assert!(err.is_err());
    }
}
