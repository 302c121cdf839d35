//! # Design
//!
//! - Provide structured, constant-message errors for configuration parsing.
//! - Capture the offending field and value so failures are reproducible.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while interpreting configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A string-coded enum value was not recognised.
    #[error("config invalid value")]
    InvalidValue {
        /// Field that failed to parse.
        field: &'static str,
        /// Offending value as provided.
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
