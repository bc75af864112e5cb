//! Plugin error types.

use thiserror::Error;

/// Errors that can occur while registering checks.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A check with the same name is already registered.
    #[error("Check already registered: {0}")]
    Duplicate(String),

    /// A check has an empty name.
    #[error("Check name must not be empty")]
    EmptyName,
}

impl PluginError {
    /// Creates a duplicate registration error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate(name.into())
    }
}
