//! Persistence of the mount's CA material.
//!
//! A validated bundle is written to two keys: the JSON storage form under
//! [`CA_BUNDLE_KEY`], then the raw certificate DER under [`CA_CERT_KEY`].
//! The backend offers no transaction, so a failure between the two leaves the
//! bundle updated and the raw certificate stale or missing. Both values are
//! derived from the same parse, which makes resubmitting the whole write a
//! complete repair.

use fail::fail_point;
use keyward_storage::{StorageBackend, StorageError};

use crate::{
    bundle::{CertBundle, ParsedCertBundle},
    error::{PkiError, PkiResult},
};

/// Key holding the JSON [`CertBundle`].
pub const CA_BUNDLE_KEY: &str = "config/ca_bundle";

/// Key holding the CA certificate's raw DER bytes.
pub const CA_CERT_KEY: &str = "ca";

/// Persists a validated CA bundle.
///
/// # Errors
///
/// - [`PkiError::Internal`] if the bundle cannot be projected to storage form.
/// - [`PkiError::Serialization`] if the storage form cannot be encoded.
/// - [`PkiError::UserInput`] if the backend rejects the bundle as too large.
/// - [`PkiError::Storage`] if either write fails. A failure on the second
///   write leaves the first in place.
#[tracing::instrument(
    skip_all,
    fields(serial = %parsed.certificate().serial_number(), key_type = %parsed.private_key_type())
)]
pub async fn write_ca<S>(storage: &S, parsed: &ParsedCertBundle) -> PkiResult<()>
where
    S: StorageBackend,
{
    let cert_bundle = parsed.to_cert_bundle()?;
    let encoded = zeroize::Zeroizing::new(
        serde_json::to_vec(&cert_bundle)
            .map_err(|e| PkiError::serialization("failed to encode CA bundle", e))?,
    );

    storage.set(CA_BUNDLE_KEY.as_bytes().to_vec(), encoded.to_vec()).await.map_err(|e| match e {
        StorageError::SizeLimitExceeded { actual, limit, .. } => PkiError::user_input(format!(
            "the CA bundle is {actual} bytes once encoded for storage, which exceeds the \
             backend limit of {limit} bytes"
        )),
        other => other.into(),
    })?;

    fail_point!("ca-store-before-raw-cert", |_| {
        Err(PkiError::internal("injected failure between CA bundle and certificate writes"))
    });

    storage.set(CA_CERT_KEY.as_bytes().to_vec(), parsed.certificate_bytes().to_vec()).await?;

    tracing::debug!("CA bundle and certificate stored");
    Ok(())
}

/// Reads back the stored CA bundle, if one has been written.
///
/// # Errors
///
/// - [`PkiError::Storage`] if the read fails.
/// - [`PkiError::Serialization`] if the stored entry is not a valid bundle.
#[tracing::instrument(skip_all)]
pub async fn fetch_ca_bundle<S>(storage: &S) -> PkiResult<Option<CertBundle>>
where
    S: StorageBackend,
{
    let Some(bytes) = storage.get(CA_BUNDLE_KEY.as_bytes()).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PkiError::serialization("failed to decode stored CA bundle", e))
}

/// Reads back the stored CA certificate DER, if one has been written.
///
/// # Errors
///
/// Returns [`PkiError::Storage`] if the read fails.
#[tracing::instrument(skip_all)]
pub async fn fetch_ca_certificate<S>(storage: &S) -> PkiResult<Option<Vec<u8>>>
where
    S: StorageBackend,
{
    Ok(storage.get(CA_CERT_KEY.as_bytes()).await?.map(|bytes| bytes.to_vec()))
}
