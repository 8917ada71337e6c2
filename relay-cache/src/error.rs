//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store failed (connection, protocol, ...)
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Operation timeout
    #[error("Cache operation timed out")]
    Timeout,

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}
