//! Error types for cache construction.
//!
//! Runtime operations on a built cache are infallible; only configuration
//! can be rejected, so the error surface stays small.

use thiserror::Error;

/// Result type alias using [`CacheError`]
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced while building a cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The requested configuration cannot be satisfied
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration
        message: String,
    },
}

impl CacheError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        CacheError::Configuration {
            message: message.into(),
        }
    }
}
