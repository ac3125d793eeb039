//! Storage error types and result alias.
//!
//! Every [`StorageBackend`](crate::StorageBackend) maps its internal failures
//! onto [`StorageError`]. Callers in the PKI layer treat these as internal
//! faults, except [`StorageError::SizeLimitExceeded`] on a CA bundle write,
//! which is reported as oversized input.
//!
//! # Example
//!
//! ```
//! use keyward_storage::{StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::not_found(key))
//! }
//!
//! assert!(lookup("ca").is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A shareable boxed error used to keep the source chain.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by storage backends.
///
/// # Non-exhaustive
///
/// New variants may be added without a breaking release. Downstream matches
/// must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The requested key does not exist.
    #[error("Key not found: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// The backend could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// A value could not be encoded for storage or decoded after retrieval.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// Backend-specific failure that fits no other category.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// A key or value exceeded the backend's configured [`SizeLimits`](crate::SizeLimits).
    #[error("{kind} size {actual} exceeds limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Which part of the entry was too large (`"key"` or `"value"`).
        kind: &'static str,
        /// Actual size in bytes.
        actual: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

impl StorageError {
    /// Creates a `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates an `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates an `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a `SizeLimitExceeded` error.
    #[must_use]
    pub fn size_limit_exceeded(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind, actual, limit }
    }
}

/// Errors raised while validating storage configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric setting is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn not_found_names_the_key() {
        let err = StorageError::not_found("config/ca_bundle");
        assert_eq!(err.to_string(), "Key not found: config/ca_bundle");
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::other("disk gone");
        let err = StorageError::internal_with_source("write failed", io);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk gone"));
    }

    #[test]
    fn size_limit_message() {
        let err = StorageError::size_limit_exceeded("value", 2048, 1024);
        assert_eq!(err.to_string(), "value size 2048 exceeds limit of 1024 bytes");
    }

    #[test]
    fn config_error_message() {
        let err = ConfigError::BelowMinimum {
            field: "max_key_size",
            min: "1".into(),
            value: "0".into(),
        };
        assert_eq!(err.to_string(), "max_key_size must be at least 1, got 0");
    }
}
