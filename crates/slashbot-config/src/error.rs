//! Config error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// The offending path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config file contained malformed JSON.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// The offending path.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The merged configuration failed validation.
    #[error("invalid config field {field}: {message}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// A config file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// The offending path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
