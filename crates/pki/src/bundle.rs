//! PEM bundle parsing and CA validation.
//!
//! A PEM bundle is the text an operator submits when configuring a CA: one
//! unencrypted private key followed by a certificate and, optionally, the
//! certificates of its chain. [`parse_pem_bundle`] decodes the blocks and
//! [`parse_and_validate_ca`] applies the acceptance rules for the CA write
//! path. Validation is pure: nothing here touches storage.
//!
//! # Example
//!
//! ```no_run
//! use keyward_pki::{PkiConfig, bundle::parse_and_validate_ca};
//!
//! # fn load() -> String { String::new() }
//! let parsed = parse_and_validate_ca(&load(), &PkiConfig::default()).unwrap();
//! println!("CA serial {}", parsed.certificate().serial_number());
//! ```

use const_oid::{
    ObjectIdentifier,
    db::{rfc5912, rfc8410},
};
use pem::{EncodeConfig, LineEnding, Pem};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    config::PkiConfig,
    error::{PkiError, PkiResult},
    key_match,
};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS1_RSA_LABEL: &str = "RSA PRIVATE KEY";
const SEC1_EC_LABEL: &str = "EC PRIVATE KEY";
const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";

pub(crate) const EMPTY_BUNDLE: &str = "'pem_bundle' was empty";
const MISSING_KEY: &str = "private key not found in the PEM bundle";
const UNKNOWN_KEY: &str = "unknown private key found in the PEM bundle";
const MISSING_CERTIFICATE: &str = "no certificate found in the PEM bundle";
const NOT_A_CA: &str =
    "the given certificate is not marked for CA use and cannot be used with this backend";
const DUPLICATE_KEY: &str =
    "more than one private key given; provide only one private key in the bundle";
const ENCRYPTED_KEY: &str =
    "encrypted private keys are not supported; decrypt the key before submitting the bundle";
const KEY_MISMATCH: &str = "public key of certificate does not match private key";
const NO_PEM_DATA: &str = "no data found in PEM block";

/// Algorithm family of a private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateKeyType {
    /// RSA, from PKCS#1 or PKCS#8.
    Rsa,
    /// Elliptic curve, from SEC1 or PKCS#8.
    Ec,
    /// Ed25519, from PKCS#8.
    Ed25519,
    /// A PKCS#8 key whose algorithm is not supported.
    Unknown,
}

impl PrivateKeyType {
    /// Whether keys of this type can back a CA.
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    fn from_pkcs8_algorithm(oid: ObjectIdentifier) -> Self {
        if oid == rfc5912::RSA_ENCRYPTION {
            Self::Rsa
        } else if oid == rfc5912::ID_EC_PUBLIC_KEY {
            Self::Ec
        } else if oid == rfc8410::ID_ED_25519 {
            Self::Ed25519
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for PrivateKeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Rsa => "rsa",
            Self::Ec => "ec",
            Self::Ed25519 => "ed25519",
            Self::Unknown => "unknown",
        })
    }
}

/// A decoded private key. The DER bytes are wiped on drop.
#[derive(Clone)]
pub struct PrivateKey {
    key_type: PrivateKeyType,
    label: String,
    der: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    /// The key's algorithm family.
    #[must_use]
    pub fn key_type(&self) -> PrivateKeyType {
        self.key_type
    }

    /// The PEM label the key was submitted under.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The key's DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub(crate) fn is_pkcs8(&self) -> bool {
        self.label == PKCS8_LABEL
    }

    /// Re-encodes the key as PEM under its original label.
    #[must_use]
    pub fn to_pem(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_pem(&self.label, self.der.to_vec()))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type)
            .field("label", &self.label)
            .field("der", &"[redacted]")
            .finish()
    }
}

/// A decoded X.509 certificate with the fields this crate inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    serial_number: String,
    subject: String,
    is_ca: bool,
    public_key: Vec<u8>,
    subject_key_id: Vec<u8>,
    authority_key_id: Vec<u8>,
}

impl Certificate {
    /// Decodes a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`PkiError::UserInput`] if `der` is not a valid X.509
    /// certificate.
    pub fn from_der(der: &[u8]) -> PkiResult<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| PkiError::user_input(format!("failed to parse certificate: {e}")))?;

        let mut subject_key_id = Vec::new();
        let mut authority_key_id = Vec::new();
        for extension in cert.extensions() {
            match extension.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(id) => subject_key_id = id.0.to_vec(),
                ParsedExtension::AuthorityKeyIdentifier(aki) => {
                    if let Some(id) = &aki.key_identifier {
                        authority_key_id = id.0.to_vec();
                    }
                },
                _ => {},
            }
        }

        Ok(Self {
            serial_number: cert.raw_serial_as_string(),
            subject: cert.subject().to_string(),
            is_ca: cert.is_ca(),
            public_key: cert.public_key().subject_public_key.data.to_vec(),
            subject_key_id,
            authority_key_id,
            der: der.to_vec(),
        })
    }

    /// The certificate's DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Serial number as colon-separated lowercase hex.
    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Subject distinguished name in RFC 4514 form.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether the basic-constraints extension marks this certificate as a CA.
    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// The `subjectPublicKey` bits of the certificate.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Subject key identifier, empty when the extension is absent.
    #[must_use]
    pub fn subject_key_id(&self) -> &[u8] {
        &self.subject_key_id
    }

    /// Authority key identifier, empty when the extension is absent.
    #[must_use]
    pub fn authority_key_id(&self) -> &[u8] {
        &self.authority_key_id
    }

    /// Encodes the certificate as PEM.
    #[must_use]
    pub fn to_pem(&self) -> String {
        encode_pem(CERTIFICATE_LABEL, self.der.clone())
    }
}

/// Result of structurally decoding a PEM bundle, before any acceptance rule
/// other than "at most one key" is applied.
#[derive(Debug, Clone, Default)]
pub struct ParsedPemBundle {
    private_key: Option<PrivateKey>,
    certificates: Vec<Certificate>,
}

impl ParsedPemBundle {
    /// The private key, if the bundle contained one.
    #[must_use]
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// Every certificate in bundle order.
    #[must_use]
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Checks key presence, key type, certificate presence, that the key
    /// belongs to the certificate, and the chain, in that order. Splits the
    /// certificates into the bundle certificate and its chain.
    ///
    /// Every chain certificate must be a CA, and each certificate's
    /// authority key identifier must equal the next one's subject key
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PkiError::UserInput`] for the first rule that fails.
    pub fn into_cert_bundle(self) -> PkiResult<ParsedCertBundle> {
        let Some(private_key) = self.private_key else {
            return Err(PkiError::user_input(MISSING_KEY));
        };
        if !private_key.key_type().is_known() {
            return Err(PkiError::user_input(UNKNOWN_KEY));
        }

        let mut certificates = self.certificates.into_iter();
        let Some(certificate) = certificates.next() else {
            return Err(PkiError::user_input(MISSING_CERTIFICATE));
        };
        if !key_match::matches_certificate(&private_key, certificate.public_key())? {
            return Err(PkiError::user_input(KEY_MISMATCH));
        }

        let ca_chain: Vec<Certificate> = certificates.collect();
        verify_chain(&certificate, &ca_chain)?;

        Ok(ParsedCertBundle { certificate, private_key, ca_chain })
    }
}

fn verify_chain(certificate: &Certificate, ca_chain: &[Certificate]) -> PkiResult<()> {
    let mut child = certificate;
    for (index, parent) in ca_chain.iter().enumerate() {
        if !parent.is_ca() {
            return Err(PkiError::user_input(format!(
                "certificate {index} of certificate chain is not a certificate authority"
            )));
        }
        if child.authority_key_id() != parent.subject_key_id() {
            return Err(PkiError::user_input(format!(
                "certificate {index} of certificate chain ca trust path is incorrect \
                 ({}/{}) vs ({}/{})",
                child.subject(),
                hex_id(child.authority_key_id()),
                parent.subject(),
                hex_id(parent.subject_key_id()),
            )));
        }
        child = parent;
    }
    Ok(())
}

fn hex_id(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

/// A bundle holding exactly one supported private key and at least one
/// certificate.
#[derive(Debug, Clone)]
pub struct ParsedCertBundle {
    certificate: Certificate,
    private_key: PrivateKey,
    ca_chain: Vec<Certificate>,
}

impl ParsedCertBundle {
    /// The bundle certificate (the first one in the PEM text).
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The raw DER bytes of the bundle certificate.
    #[must_use]
    pub fn certificate_bytes(&self) -> &[u8] {
        self.certificate.der()
    }

    /// The private key.
    #[must_use]
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The private key's algorithm family.
    #[must_use]
    pub fn private_key_type(&self) -> PrivateKeyType {
        self.private_key.key_type()
    }

    /// Certificates following the bundle certificate.
    #[must_use]
    pub fn ca_chain(&self) -> &[Certificate] {
        &self.ca_chain
    }

    /// Projects the bundle into its storage form.
    ///
    /// # Errors
    ///
    /// Returns [`PkiError::Internal`] if the key type cannot be represented.
    pub fn to_cert_bundle(&self) -> PkiResult<CertBundle> {
        if !self.private_key_type().is_known() {
            return Err(PkiError::internal(format!(
                "cannot store a bundle with private key type {}",
                self.private_key_type()
            )));
        }

        Ok(CertBundle {
            certificate: self.certificate.to_pem(),
            private_key: self.private_key.to_pem().to_string(),
            private_key_type: self.private_key_type(),
            ca_chain: self.ca_chain.iter().map(Certificate::to_pem).collect(),
            serial_number: self.certificate.serial_number().to_owned(),
        })
    }
}

/// Storage form of a CA bundle, persisted as JSON under `config/ca_bundle`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CertBundle {
    /// PEM certificate.
    pub certificate: String,
    /// PEM private key.
    pub private_key: String,
    /// Private key algorithm family.
    #[zeroize(skip)]
    pub private_key_type: PrivateKeyType,
    /// PEM certificates of the chain, in submission order.
    #[serde(default)]
    pub ca_chain: Vec<String>,
    /// Serial number of `certificate` as colon-separated hex.
    pub serial_number: String,
}

impl CertBundle {
    /// Decodes the stored PEM back into a [`ParsedCertBundle`].
    ///
    /// # Errors
    ///
    /// Returns [`PkiError::Internal`] if the stored entry no longer parses.
    pub fn to_parsed(&self) -> PkiResult<ParsedCertBundle> {
        let mut text = Zeroizing::new(String::new());
        text.push_str(&self.private_key);
        text.push_str(&self.certificate);
        for cert in &self.ca_chain {
            text.push_str(cert);
        }

        parse_pem_bundle(&text).and_then(ParsedPemBundle::into_cert_bundle).map_err(|e| {
            PkiError::internal_with_source("stored CA bundle could not be decoded", e)
        })
    }
}

impl std::fmt::Debug for CertBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertBundle")
            .field("certificate", &self.certificate)
            .field("private_key", &"[redacted]")
            .field("private_key_type", &self.private_key_type)
            .field("ca_chain", &self.ca_chain.len())
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

fn encode_pem(label: &str, contents: Vec<u8>) -> String {
    pem::encode_config(
        &Pem::new(label, contents),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    )
}

fn is_legacy_encrypted(block: &Pem) -> bool {
    block.headers().get("Proc-Type").is_some_and(|value| value.contains("ENCRYPTED"))
}

fn decode_private_key(block: &Pem) -> PkiResult<PrivateKey> {
    if block.tag() == ENCRYPTED_PKCS8_LABEL || is_legacy_encrypted(block) {
        return Err(PkiError::user_input(ENCRYPTED_KEY));
    }

    let contents = block.contents();
    let key_type = match block.tag() {
        PKCS8_LABEL => {
            let info = pkcs8::PrivateKeyInfo::try_from(contents).map_err(|e| {
                PkiError::user_input(format!("failed to parse PKCS#8 private key: {e}"))
            })?;
            PrivateKeyType::from_pkcs8_algorithm(info.algorithm.oid)
        },
        PKCS1_RSA_LABEL | SEC1_EC_LABEL => {
            der::Document::try_from(contents).map_err(|e| {
                PkiError::user_input(format!("failed to parse {} block: {e}", block.tag()))
            })?;
            if block.tag() == PKCS1_RSA_LABEL { PrivateKeyType::Rsa } else { PrivateKeyType::Ec }
        },
        other => return Err(PkiError::internal(format!("{other} is not a private key label"))),
    };

    Ok(PrivateKey {
        key_type,
        label: block.tag().to_owned(),
        der: Zeroizing::new(contents.to_vec()),
    })
}

fn has_trailing_data(text: &str) -> bool {
    const END_MARKER: &str = "-----END ";
    let Some(start) = text.rfind(END_MARKER) else {
        return false;
    };
    let after_label = &text[start + END_MARKER.len()..];
    after_label
        .find("-----")
        .is_some_and(|close| !after_label[close + "-----".len()..].trim().is_empty())
}

fn is_private_key_label(label: &str) -> bool {
    matches!(label, PKCS8_LABEL | PKCS1_RSA_LABEL | SEC1_EC_LABEL | ENCRYPTED_PKCS8_LABEL)
}

/// Structurally decodes a PEM bundle.
///
/// Certificates keep their bundle order. Blocks with labels other than
/// certificates and private keys are skipped. Whitespace-only text decodes to
/// an empty bundle.
///
/// # Errors
///
/// Returns [`PkiError::UserInput`] if the text holds no PEM block or has
/// data after the last one, a block is malformed, a key is encrypted, or
/// more than one private key is present.
pub fn parse_pem_bundle(text: &str) -> PkiResult<ParsedPemBundle> {
    let blocks = pem::parse_many(text)
        .map_err(|e| PkiError::user_input(format!("failed to decode PEM bundle: {e}")))?;
    if blocks.is_empty() && !text.trim().is_empty() {
        return Err(PkiError::user_input(NO_PEM_DATA));
    }
    if has_trailing_data(text) {
        return Err(PkiError::user_input(NO_PEM_DATA));
    }

    let mut parsed = ParsedPemBundle::default();
    for block in &blocks {
        match block.tag() {
            CERTIFICATE_LABEL => parsed.certificates.push(Certificate::from_der(block.contents())?),
            label if is_private_key_label(label) => {
                if parsed.private_key.is_some() {
                    return Err(PkiError::user_input(DUPLICATE_KEY));
                }
                parsed.private_key = Some(decode_private_key(block)?);
            },
            label => tracing::debug!(label, "skipping PEM block with unrecognized label"),
        }
    }

    Ok(parsed)
}

/// Parses `pem_bundle` and checks that it can be installed as the mount's CA.
///
/// Checks run in order and the first failure is returned: non-empty, within
/// [`PkiConfig::max_pem_bundle_size`], structurally valid, private key
/// present, key type supported, certificate present, key matches the
/// certificate, chain linked, certificate marked as a CA.
///
/// # Errors
///
/// Returns [`PkiError::UserInput`] describing the first failed check.
pub fn parse_and_validate_ca(pem_bundle: &str, config: &PkiConfig) -> PkiResult<ParsedCertBundle> {
    if pem_bundle.is_empty() {
        return Err(PkiError::user_input(EMPTY_BUNDLE));
    }
    if pem_bundle.len() > config.max_pem_bundle_size() {
        return Err(PkiError::user_input(format!(
            "'pem_bundle' is {} bytes, which exceeds the maximum of {} bytes",
            pem_bundle.len(),
            config.max_pem_bundle_size()
        )));
    }

    let parsed = parse_pem_bundle(pem_bundle)?.into_cert_bundle()?;
    if !parsed.certificate().is_ca() {
        return Err(PkiError::user_input(NOT_A_CA));
    }

    Ok(parsed)
}
