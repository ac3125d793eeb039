//! Revocation-list collaborator contract.
//!
//! CRL generation lives outside this crate. The CA write path only needs a
//! way to ask for a forced rebuild once new CA material is committed.

use std::sync::Arc;

use async_trait::async_trait;
use keyward_storage::BoxError;
use thiserror::Error;

/// Failure reported by a [`CrlBuilder`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CrlError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CrlError {
    /// Creates an error with a message and no source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Creates an error wrapping `source`.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Rebuilds the certificate revocation list for the mount.
///
/// Called synchronously after every successful CA write with
/// `force_regenerate = true`. An error is surfaced to the caller as the
/// operation's error; storage writes that preceded the call stay committed.
#[async_trait]
pub trait CrlBuilder: Send + Sync {
    /// Rebuilds the CRL. `force_regenerate` bypasses any freshness check the
    /// builder keeps.
    async fn build_crl(&self, force_regenerate: bool) -> Result<(), CrlError>;
}

#[async_trait]
impl<T: CrlBuilder + ?Sized> CrlBuilder for Arc<T> {
    async fn build_crl(&self, force_regenerate: bool) -> Result<(), CrlError> {
        (**self).build_crl(force_regenerate).await
    }
}

/// A [`CrlBuilder`] for mounts with revocation lists disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCrlBuilder;

#[async_trait]
impl CrlBuilder for NoopCrlBuilder {
    async fn build_crl(&self, _force_regenerate: bool) -> Result<(), CrlError> {
        tracing::trace!("CRL rebuild skipped; revocation lists disabled");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_builder_always_succeeds() {
        NoopCrlBuilder.build_crl(true).await.unwrap();
        NoopCrlBuilder.build_crl(false).await.unwrap();
    }

    #[tokio::test]
    async fn arc_forwards_to_inner() {
        let builder: Arc<dyn CrlBuilder> = Arc::new(NoopCrlBuilder);
        builder.build_crl(true).await.unwrap();
    }

    #[test]
    fn error_keeps_source() {
        use std::error::Error as _;
        let err = CrlError::with_source("rebuild failed", std::io::Error::other("disk"));
        assert_eq!(err.message(), "rebuild failed");
        assert!(err.source().is_some());
    }
}
