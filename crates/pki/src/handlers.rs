//! Administrative request handlers.
//!
//! Each handler takes the mount's storage and a typed request and returns a
//! [`Response`]. Failures the operator can act on (bad input, unknown
//! references) come back as [`Response::Error`]. Internal faults are returned
//! as `Err` so the caller can report them as server errors.

use keyward_storage::StorageBackend;
use pem::{EncodeConfig, LineEnding, Pem};
use serde::{Deserialize, Serialize};

use crate::{
    bundle::parse_and_validate_ca,
    ca_store,
    config::PkiConfig,
    crl::CrlBuilder,
    error::{PkiError, PkiResult},
    issuer::{self, IssuerId},
};

/// Body of a structured error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Operator-facing message.
    pub error: String,
}

/// Outcome of a handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response<T> {
    /// Success with a body.
    Data(T),
    /// Success with no body.
    NoContent,
    /// The request was rejected.
    Error(ErrorResponse),
}

impl<T> Response<T> {
    /// Builds an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse { error: message.into() })
    }

    /// Whether this is [`Response::Error`].
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The error message, if this is an error response.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(body) => Some(&body.error),
            _ => None,
        }
    }

    /// The body, if this is a data response.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Request to install the mount's CA.
#[derive(Clone, Serialize, Deserialize)]
pub struct WriteCaRequest {
    /// Unencrypted private key and certificates, PEM encoded.
    #[serde(default)]
    pub pem_bundle: String,
}

impl std::fmt::Debug for WriteCaRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCaRequest").field("pem_bundle", &"[redacted]").finish()
    }
}

/// Issuers configuration as exchanged with operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuersConfigData {
    /// On write, an issuer reference; on read, the resolved identifier.
    #[serde(default)]
    pub default: String,
}

/// The mount's CA certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaCertificateData {
    /// PEM certificate.
    pub certificate: String,
}

/// Request to add an issuer to the registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct ImportIssuerRequest {
    /// Unencrypted private key and certificates, PEM encoded.
    #[serde(default)]
    pub pem_bundle: String,
    /// Optional unique name.
    #[serde(default)]
    pub issuer_name: String,
}

impl std::fmt::Debug for ImportIssuerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportIssuerRequest")
            .field("pem_bundle", &"[redacted]")
            .field("issuer_name", &self.issuer_name)
            .finish()
    }
}

/// Result of an issuer import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssuerData {
    /// Identifier of the new issuer.
    pub issuer_id: IssuerId,
    /// Name of the new issuer; empty when unnamed.
    pub issuer_name: String,
}

/// Turns user-facing failures into error responses and passes internal
/// faults through.
fn user_facing<T>(err: PkiError, prefix: Option<&str>) -> PkiResult<Response<T>> {
    if !err.is_user_facing() {
        return Err(err);
    }
    Ok(match prefix {
        Some(prefix) => Response::error(format!("{prefix}{err}")),
        None => Response::error(err.to_string()),
    })
}

/// Handlers for CA configuration and the issuer registry of one mount.
#[derive(Debug, Clone)]
pub struct PkiHandlers<C> {
    config: PkiConfig,
    crl_builder: C,
}

impl<C: CrlBuilder> PkiHandlers<C> {
    /// Creates handlers using `crl_builder` for post-write CRL rebuilds.
    #[must_use]
    pub fn new(config: PkiConfig, crl_builder: C) -> Self {
        Self { config, crl_builder }
    }

    /// The mount configuration.
    #[must_use]
    pub fn config(&self) -> &PkiConfig {
        &self.config
    }

    /// The CRL builder.
    #[must_use]
    pub fn crl_builder(&self) -> &C {
        &self.crl_builder
    }

    /// Validates and installs a CA bundle, then forces a CRL rebuild.
    ///
    /// Validation failures, and a bundle too large for the backend, return
    /// [`Response::Error`] and leave storage untouched. A failed rebuild is returned as [`PkiError::Crl`]; the CA
    /// stays installed.
    ///
    /// # Errors
    ///
    /// Storage, encoding and CRL failures.
    #[tracing::instrument(skip_all)]
    pub async fn write_ca<S>(
        &self,
        storage: &S,
        request: WriteCaRequest,
    ) -> PkiResult<Response<()>>
    where
        S: StorageBackend,
    {
        let parsed = match parse_and_validate_ca(&request.pem_bundle, &self.config) {
            Ok(parsed) => parsed,
            Err(err) => return user_facing(err, None),
        };

        if let Err(err) = ca_store::write_ca(storage, &parsed).await {
            return user_facing(err, None);
        }

        if let Err(err) = self.crl_builder.build_crl(true).await {
            tracing::warn!(error = %err, "CA stored but CRL rebuild failed");
            return Err(err.into());
        }

        tracing::debug!(serial = %parsed.certificate().serial_number(), "CA configured");
        Ok(Response::NoContent)
    }

    /// Returns the configured default issuer identifier.
    ///
    /// # Errors
    ///
    /// Storage failures.
    #[tracing::instrument(skip_all)]
    pub async fn read_issuers_config<S>(
        &self,
        storage: &S,
    ) -> PkiResult<Response<IssuersConfigData>>
    where
        S: StorageBackend,
    {
        let config = issuer::get_issuers_config(storage).await?;
        Ok(Response::Data(IssuersConfigData { default: config.default.to_string() }))
    }

    /// Sets the default issuer from a reference.
    ///
    /// The value is checked before resolution: `""` and `"default"` are
    /// rejected even when issuers exist. The resolved identifier, not the
    /// submitted reference, is stored and returned.
    ///
    /// # Errors
    ///
    /// Storage failures.
    #[tracing::instrument(skip_all, fields(reference = %request.default))]
    pub async fn write_issuers_config<S>(
        &self,
        storage: &S,
        request: IssuersConfigData,
    ) -> PkiResult<Response<IssuersConfigData>>
    where
        S: StorageBackend,
    {
        if let Err(err) = issuer::validate_default_issuer_value(&request.default) {
            return user_facing(err, None);
        }

        let id = match issuer::resolve_issuer_reference(storage, &request.default).await {
            Ok(id) => id,
            Err(err) => return user_facing(err, Some("Error resolving issuer reference: ")),
        };

        issuer::update_default_issuer_id(storage, &id).await?;
        Ok(Response::Data(IssuersConfigData { default: id.to_string() }))
    }

    /// Returns the installed CA certificate as PEM.
    ///
    /// # Errors
    ///
    /// Storage failures.
    #[tracing::instrument(skip_all)]
    pub async fn read_ca_certificate<S>(
        &self,
        storage: &S,
    ) -> PkiResult<Response<CaCertificateData>>
    where
        S: StorageBackend,
    {
        let Some(der) = ca_store::fetch_ca_certificate(storage).await? else {
            return Ok(Response::error("no CA certificate has been configured"));
        };
        let certificate = pem::encode_config(
            &Pem::new("CERTIFICATE", der),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        );
        Ok(Response::Data(CaCertificateData { certificate }))
    }

    /// Validates a CA bundle and adds it to the issuer registry.
    ///
    /// # Errors
    ///
    /// Storage and encoding failures.
    #[tracing::instrument(skip_all, fields(issuer_name = %request.issuer_name))]
    pub async fn import_issuer<S>(
        &self,
        storage: &S,
        request: ImportIssuerRequest,
    ) -> PkiResult<Response<ImportIssuerData>>
    where
        S: StorageBackend,
    {
        let parsed = match parse_and_validate_ca(&request.pem_bundle, &self.config) {
            Ok(parsed) => parsed,
            Err(err) => return user_facing(err, None),
        };

        match issuer::import_issuer(storage, &parsed, &request.issuer_name).await {
            Ok(entry) => Ok(Response::Data(ImportIssuerData {
                issuer_id: entry.id,
                issuer_name: entry.name,
            })),
            Err(err) => user_facing(err, None),
        }
    }
}
