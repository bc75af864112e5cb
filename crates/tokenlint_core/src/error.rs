//! Linter error types.

use thiserror::Error;

/// Errors that can occur during linting.
///
/// Problems with individual files never surface here; they are reported as
/// diagnostics instead.
#[derive(Debug, Error)]
pub enum LinterError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error outside of per-file checking.
    #[error("File error: {0}")]
    File(String),

    /// Malformed diff input.
    #[error("Diff error: {0}")]
    Diff(String),

    /// Invalid glob pattern.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Check registration error.
    #[error("Plugin error: {0}")]
    Plugin(#[from] tokenlint_plugin::PluginError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LinterError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    /// Creates a diff error.
    pub fn diff(message: impl Into<String>) -> Self {
        Self::Diff(message.into())
    }

    /// Creates a pattern error.
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
