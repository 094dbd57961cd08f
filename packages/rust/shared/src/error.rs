//! Error types for dbtools.
//!
//! Library crates use [`DbToolsError`] via `thiserror`.
//! App crates (cli/xtask) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all dbtools operations.
#[derive(Debug, thiserror::Error)]
pub enum DbToolsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed input (CSV record, JSON document, SQL statement).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (row arity, unknown table, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Input or output file does not carry the extension of its format.
    #[error("{role} file '{}' is not {expected}", path.display())]
    Extension {
        role: &'static str,
        path: PathBuf,
        expected: &'static str,
    },

    /// Encoding a table into an output format failed.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DbToolsError>;

impl DbToolsError {
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
}
