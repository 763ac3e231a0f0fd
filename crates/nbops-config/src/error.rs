//! Error types for configuration resolution and manifest loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the accepted environment variables (or flags) supplied a value.
    #[error("missing required configuration: set one of {}", names.join(", "))]
    MissingVariable {
        /// Accepted variable names, in precedence order.
        names: &'static [&'static str],
    },
    /// The API base URL could not be parsed.
    #[error("invalid API base URL '{value}'")]
    InvalidUrl {
        /// Offending value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// The API base URL parsed but cannot carry paths.
    #[error("API base URL '{value}' cannot be used as a base")]
    UnsupportedUrl {
        /// Offending value.
        value: String,
    },
    /// The request timeout was not a positive integer.
    #[error("invalid timeout '{value}': expected a positive number of seconds")]
    InvalidTimeout {
        /// Offending value.
        value: String,
    },
    /// A manifest file could not be read.
    #[error("failed to read {}", path.display())]
    ManifestRead {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A manifest file was not valid JSON for the expected shape.
    #[error("{} is not a valid manifest", path.display())]
    ManifestParse {
        /// File that failed.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// Writing an export file failed.
    #[error("failed to write {}", path.display())]
    ExportWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Serialising an export document failed.
    #[error("failed to serialize export document")]
    ExportSerialize {
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
