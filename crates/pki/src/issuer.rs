//! Issuer registry and default-issuer configuration.
//!
//! Issuers are stored one per key under [`ISSUER_PREFIX`] and are referenced
//! by name, by identifier, or by the reserved alias [`DEFAULT_REF`]. The alias
//! resolves to the identifier recorded in [`IssuersConfig`] under
//! [`ISSUERS_CONFIG_KEY`]; it is never a valid value to record there.
//!
//! Resolution and validation are separate functions. Resolution must accept
//! `default` (callers use it to look the default up), while the write path
//! for the default must reject it before resolution is ever attempted.

use chrono::{DateTime, Utc};
use keyward_storage::{StorageBackend, prefix_range};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    bundle::{Certificate, ParsedCertBundle},
    error::{PkiError, PkiResult},
};

/// Key holding the JSON [`IssuersConfig`].
pub const ISSUERS_CONFIG_KEY: &str = "config/issuers";

/// Prefix of the per-issuer keys.
pub const ISSUER_PREFIX: &str = "config/issuer/";

/// The reserved issuer reference naming the configured default.
pub const DEFAULT_REF: &str = "default";

pub(crate) const INVALID_DEFAULT_VALUE: &str =
    "Invalid issuer specification; must be non-empty and can't be 'default'.";

/// Stable identifier of an issuer.
///
/// Identifiers are UUID v4 strings when minted by [`import_issuer`]. The empty
/// identifier means "none" and is what [`IssuersConfig`] holds before a
/// default has been set.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerId(String);

impl IssuerId {
    /// Mints a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty "none" identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for IssuerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for IssuerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for IssuerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mount-wide issuer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuersConfig {
    /// Identifier of the default issuer; empty when none is configured.
    #[serde(default)]
    pub default: IssuerId,
}

/// A stored issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerEntry {
    /// Stable identifier.
    pub id: IssuerId,
    /// Operator-chosen name; empty when unnamed.
    #[serde(default)]
    pub name: String,
    /// PEM certificate.
    pub certificate: String,
    /// PEM certificates of the chain.
    #[serde(default)]
    pub ca_chain: Vec<String>,
    /// Serial number as colon-separated hex.
    pub serial_number: String,
    /// When the issuer was imported.
    pub created_at: DateTime<Utc>,
}

fn issuer_key(id: &IssuerId) -> Vec<u8> {
    format!("{ISSUER_PREFIX}{id}").into_bytes()
}

/// Reads the issuers configuration, defaulting when it has never been written.
///
/// # Errors
///
/// Returns [`PkiError::Storage`] if the read fails or the entry is corrupt.
#[tracing::instrument(skip_all)]
pub async fn get_issuers_config<S>(storage: &S) -> PkiResult<IssuersConfig>
where
    S: StorageBackend,
{
    Ok(storage.get_json(ISSUERS_CONFIG_KEY.as_bytes()).await?.unwrap_or_default())
}

/// Records `id` as the default issuer.
///
/// The identifier is stored as given. Callers are expected to have produced
/// it with [`resolve_issuer_reference`].
///
/// # Errors
///
/// Returns [`PkiError::Storage`] if the read or write fails.
#[tracing::instrument(skip_all, fields(issuer_id = %id))]
pub async fn update_default_issuer_id<S>(storage: &S, id: &IssuerId) -> PkiResult<()>
where
    S: StorageBackend,
{
    let mut config = get_issuers_config(storage).await?;
    config.default = id.clone();
    storage.set_json(ISSUERS_CONFIG_KEY.as_bytes().to_vec(), &config).await?;
    tracing::debug!("default issuer updated");
    Ok(())
}

/// Rejects values that can never be recorded as the default issuer: the
/// empty string and the reserved alias.
///
/// # Errors
///
/// Returns [`PkiError::UserInput`] for `""` and `"default"`.
pub fn validate_default_issuer_value(value: &str) -> PkiResult<()> {
    if value.is_empty() || value == DEFAULT_REF {
        return Err(PkiError::user_input(INVALID_DEFAULT_VALUE));
    }
    Ok(())
}

/// Resolves an issuer reference to an identifier.
///
/// [`DEFAULT_REF`] resolves to the configured default. Any other reference is
/// matched against issuer names first, then identifiers.
///
/// # Errors
///
/// - [`PkiError::NotFound`] if nothing matches, or the reference is
///   [`DEFAULT_REF`] and no default is configured.
/// - [`PkiError::Storage`] if storage cannot be read.
#[tracing::instrument(skip(storage))]
pub async fn resolve_issuer_reference<S>(storage: &S, reference: &str) -> PkiResult<IssuerId>
where
    S: StorageBackend,
{
    if reference == DEFAULT_REF {
        let config = get_issuers_config(storage).await?;
        if config.default.is_empty() {
            return Err(PkiError::not_found("no default issuer currently configured"));
        }
        return Ok(config.default);
    }

    let issuers = list_issuers(storage).await?;
    issuers
        .iter()
        .find(|entry| !entry.name.is_empty() && entry.name == reference)
        .or_else(|| issuers.iter().find(|entry| entry.id.as_str() == reference))
        .map(|entry| entry.id.clone())
        .ok_or_else(|| {
            PkiError::not_found(format!("unable to find PKI issuer for reference: {reference}"))
        })
}

/// Stores a validated CA as a new issuer.
///
/// An empty `name` leaves the issuer unnamed. Named issuers must have a name
/// that is unique and is not [`DEFAULT_REF`].
///
/// # Errors
///
/// - [`PkiError::UserInput`] if the name is reserved or already taken.
/// - [`PkiError::Storage`] if storage fails.
#[tracing::instrument(
    skip(storage, parsed),
    fields(serial = %parsed.certificate().serial_number())
)]
pub async fn import_issuer<S>(
    storage: &S,
    parsed: &ParsedCertBundle,
    name: &str,
) -> PkiResult<IssuerEntry>
where
    S: StorageBackend,
{
    if name == DEFAULT_REF {
        return Err(PkiError::user_input("issuer name cannot be the reserved value 'default'"));
    }
    if !name.is_empty() && list_issuers(storage).await?.iter().any(|entry| entry.name == name) {
        return Err(PkiError::user_input(format!("issuer name already in use: {name}")));
    }

    let entry = IssuerEntry {
        id: IssuerId::generate(),
        name: name.to_owned(),
        certificate: parsed.certificate().to_pem(),
        ca_chain: parsed.ca_chain().iter().map(Certificate::to_pem).collect(),
        serial_number: parsed.certificate().serial_number().to_owned(),
        created_at: Utc::now(),
    };
    storage.set_json(issuer_key(&entry.id), &entry).await?;

    tracing::debug!(issuer_id = %entry.id, "issuer imported");
    Ok(entry)
}

/// Reads one issuer by identifier.
///
/// # Errors
///
/// Returns [`PkiError::Storage`] if the read fails or the entry is corrupt.
#[tracing::instrument(skip(storage))]
pub async fn fetch_issuer<S>(storage: &S, id: &IssuerId) -> PkiResult<Option<IssuerEntry>>
where
    S: StorageBackend,
{
    Ok(storage.get_json(&issuer_key(id)).await?)
}

/// Lists every stored issuer in identifier order.
///
/// # Errors
///
/// - [`PkiError::Storage`] if the scan fails.
/// - [`PkiError::Serialization`] if an entry is corrupt.
#[tracing::instrument(skip_all)]
pub async fn list_issuers<S>(storage: &S) -> PkiResult<Vec<IssuerEntry>>
where
    S: StorageBackend,
{
    storage
        .get_range(prefix_range(ISSUER_PREFIX.as_bytes()))
        .await?
        .iter()
        .map(|kv| {
            serde_json::from_slice(&kv.value).map_err(|e| {
                PkiError::serialization(
                    format!("failed to decode issuer entry {}", String::from_utf8_lossy(&kv.key)),
                    e,
                )
            })
        })
        .collect()
}
