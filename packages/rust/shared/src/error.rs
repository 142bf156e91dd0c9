//! Error types for frbsync.
//!
//! Library crates use [`FrbSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all frbsync operations.
#[derive(Debug, thiserror::Error)]
pub enum FrbSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The catalog could not be opened at all. Fatal for a pipeline run.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Decoding error for oracle output or persisted values.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A candidate is missing a required field or carries a non-numeric one.
    #[error("malformed candidate: {message}")]
    Malformed { message: String },

    /// Data validation error (column mismatch, invalid value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FrbSyncError>;

impl FrbSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a malformed-candidate error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CatalogUnavailable(_))
    }
}
