//! Error types for dtrain.
//!
//! Every failure is fatal for the configuration entry that produced it. The
//! variants map one-to-one onto the stages of a run so the binary can report
//! which stage failed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dtrain error types
#[derive(Error, Debug)]
pub enum Error {
    /// A run configuration or model definition cannot be loaded or is malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Registration of a train or validation dataset failed.
    #[error("dataset `{dataset}`: {reason}")]
    Dataset {
        /// Name the dataset was being registered under
        dataset: String,
        /// What was wrong with it
        reason: String,
    },

    /// The external training procedure failed.
    #[error("training `{model}` failed: {reason}")]
    Training {
        /// Short model name of the failed run
        model: String,
        /// Exit status or spawn failure
        reason: String,
    },

    /// A metrics log line does not match the expected grammar.
    #[error("metrics log {}: {source}", path.display())]
    Parse {
        /// Log file being normalized
        path: PathBuf,
        /// Offending line and reason
        #[source]
        source: ParseError,
    },

    /// Filesystem operation failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path the operation was applied to
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Build an [`Error::Io`] tagged with the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Name of the run stage this error belongs to.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Dataset { .. } => "dataset registration",
            Self::Training { .. } => "training",
            Self::Parse { .. } => "metrics parsing",
            Self::Io { .. } => "filesystem",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// A metrics log line that does not follow the `{"key": number, ...}` grammar.
///
/// `line` and `column` are 1-based; `column` counts characters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

/// What exactly was wrong with a metrics line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected `{{` at start of record")]
    MissingOpenBrace,

    #[error("expected `}}` at end of record")]
    MissingCloseBrace,

    #[error("expected a quoted metric name, found {0}")]
    ExpectedKey(String),

    #[error("unterminated metric name")]
    UnterminatedKey,

    #[error("empty metric name")]
    EmptyKey,

    #[error("metric `{0}` is missing the `: ` separator")]
    MissingSeparator(String),

    #[error("metric `{0}` has no value")]
    MissingValue(String),

    #[error("metric `{key}` has non-numeric value `{value}`")]
    NonNumeric { key: String, value: String },

    #[error("metric `{key}` has non-finite value `{value}`")]
    NonFinite { key: String, value: String },

    #[error("expected `,` or `}}` after value, found {0}")]
    ExpectedDelimiter(String),

    #[error("unexpected {0} after record")]
    TrailingInput(String),

    #[error("required metric `{0}` is missing")]
    MissingRequiredKey(String),
}
