//! Error types for the CA lifecycle core.
//!
//! Every failure carries an [`ErrorKind`] that callers read through
//! [`PkiError::kind`]. Handlers use the kind, not the variant, to decide
//! whether a failure is reported back to the operator as a structured error
//! or propagated as an internal fault.

use keyward_storage::{BoxError, StorageError};
use thiserror::Error;

use crate::crl::CrlError;

/// Result type alias for PKI operations.
pub type PkiResult<T> = Result<T, PkiError>;

/// Classification of a [`PkiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was malformed or failed validation.
    UserInput,
    /// A referenced entity does not exist.
    NotFound,
    /// Storage, encoding or collaborator failure.
    Internal,
}

/// Errors produced by bundle validation, CA storage and the issuer registry.
///
/// # Non-exhaustive
///
/// New variants may be added without a breaking release. Match on
/// [`kind`](Self::kind) instead of individual variants where possible.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PkiError {
    /// Operator-supplied input was rejected.
    #[error("{message}")]
    UserInput {
        /// Message returned verbatim to the operator.
        message: String,
    },

    /// An issuer reference could not be resolved.
    #[error("{message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// Internal fault that is not the operator's doing.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the fault.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored entry could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// The CRL builder failed after CA material was committed.
    #[error("error building CRL: {0}")]
    Crl(#[from] CrlError),
}

impl PkiError {
    /// Creates a `UserInput` error.
    #[must_use]
    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput { message: message.into() }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Creates an `Internal` error with no source.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates an `Internal` error wrapping `source`.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(std::sync::Arc::new(source)) }
    }

    /// Creates a `Serialization` error wrapping `source`.
    #[must_use]
    pub fn serialization(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(std::sync::Arc::new(source)) }
    }

    /// The classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserInput { .. } => ErrorKind::UserInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. }
            | Self::Storage(_)
            | Self::Serialization { .. }
            | Self::Crl(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error should be reported back to the operator rather than
    /// treated as a fault.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self.kind(), ErrorKind::UserInput | ErrorKind::NotFound)
    }
}
