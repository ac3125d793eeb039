//! Matching a private key against a certificate's public key.
//!
//! The public key is derived from the private key and compared with the
//! `subjectPublicKey` bits of the certificate. A certificate whose key is of a
//! different algorithm simply fails to match.

use ed25519_dalek::SigningKey;
use pkcs8::DecodePrivateKey;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
};

use crate::{
    bundle::{PrivateKey, PrivateKeyType},
    error::{PkiError, PkiResult},
};

const UNSUPPORTED_CURVE: &str =
    "unsupported elliptic curve for the private key; P-256 and P-384 keys are accepted";

/// Whether `key` is the private half of `cert_public_key`.
///
/// # Errors
///
/// Returns [`PkiError::UserInput`] if the private key cannot be decoded for
/// its algorithm or uses an unsupported curve.
pub(crate) fn matches_certificate(key: &PrivateKey, cert_public_key: &[u8]) -> PkiResult<bool> {
    match key.key_type() {
        PrivateKeyType::Rsa => rsa_matches(key, cert_public_key),
        PrivateKeyType::Ec => ec_matches(key, cert_public_key),
        PrivateKeyType::Ed25519 => ed25519_matches(key, cert_public_key),
        PrivateKeyType::Unknown => Ok(false),
    }
}

fn decode_error(key: &PrivateKey, err: impl std::fmt::Display) -> PkiError {
    PkiError::user_input(format!("failed to decode {} private key: {err}", key.key_type()))
}

fn rsa_matches(key: &PrivateKey, cert_public_key: &[u8]) -> PkiResult<bool> {
    let private = if key.is_pkcs8() {
        RsaPrivateKey::from_pkcs8_der(key.der()).map_err(|e| decode_error(key, e))?
    } else {
        RsaPrivateKey::from_pkcs1_der(key.der()).map_err(|e| decode_error(key, e))?
    };

    Ok(RsaPublicKey::from_pkcs1_der(cert_public_key)
        .is_ok_and(|public| public == private.to_public_key()))
}

fn ec_matches(key: &PrivateKey, cert_public_key: &[u8]) -> PkiResult<bool> {
    if let Some(matched) = p256_matches(key, cert_public_key) {
        return Ok(matched);
    }
    if let Some(matched) = p384_matches(key, cert_public_key) {
        return Ok(matched);
    }
    Err(PkiError::user_input(UNSUPPORTED_CURVE))
}

// `None` means the key is not on this curve.
fn p256_matches(key: &PrivateKey, cert_public_key: &[u8]) -> Option<bool> {
    let secret = if key.is_pkcs8() {
        p256::SecretKey::from_pkcs8_der(key.der()).ok()?
    } else {
        p256::SecretKey::from_sec1_der(key.der()).ok()?
    };
    Some(
        p256::PublicKey::from_sec1_bytes(cert_public_key)
            .is_ok_and(|public| public == secret.public_key()),
    )
}

fn p384_matches(key: &PrivateKey, cert_public_key: &[u8]) -> Option<bool> {
    let secret = if key.is_pkcs8() {
        p384::SecretKey::from_pkcs8_der(key.der()).ok()?
    } else {
        p384::SecretKey::from_sec1_der(key.der()).ok()?
    };
    Some(
        p384::PublicKey::from_sec1_bytes(cert_public_key)
            .is_ok_and(|public| public == secret.public_key()),
    )
}

fn ed25519_matches(key: &PrivateKey, cert_public_key: &[u8]) -> PkiResult<bool> {
    let signing = SigningKey::from_pkcs8_der(key.der()).map_err(|e| decode_error(key, e))?;
    Ok(signing.verifying_key().as_bytes().as_slice() == cert_public_key)
}
