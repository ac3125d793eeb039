//! Test helpers for code built on the CA lifecycle core.
//!
//! Feature-gated behind `testutil`:
//!
//! ```toml
//! [dev-dependencies]
//! keyward-pki = { path = "../pki", features = ["testutil"] }
//! ```
//!
//! Certificates are minted with `rcgen` at call time, including signed CA
//! hierarchies from [`ec_chain`]. RSA material cannot be generated that way,
//! so a fixed RSA root (PKCS#1 key) and an EC root with a SEC1 key are
//! embedded from `tests/fixtures/`.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair, KeyUsagePurpose,
    PKCS_ECDSA_P256_SHA256, PKCS_ED25519, SignatureAlgorithm,
};

use crate::crl::{CrlBuilder, CrlError};

/// Self-signed RSA CA certificate.
pub const RSA_CA_CERT_PEM: &str = include_str!("../tests/fixtures/rsa_ca_cert.pem");
/// PKCS#1 key for [`RSA_CA_CERT_PEM`].
pub const RSA_CA_KEY_PEM: &str = include_str!("../tests/fixtures/rsa_ca_key.pem");
/// Self-signed P-256 CA certificate.
pub const EC_CA_CERT_PEM: &str = include_str!("../tests/fixtures/ec_ca_cert.pem");
/// SEC1 key for [`EC_CA_CERT_PEM`].
pub const EC_CA_KEY_PEM: &str = include_str!("../tests/fixtures/ec_ca_key.pem");
/// PKCS#8 X25519 key, a key-agreement algorithm no CA can use.
pub const X25519_KEY_PEM: &str = include_str!("../tests/fixtures/x25519_key.pem");
/// [`RSA_CA_KEY_PEM`] as an `ENCRYPTED PRIVATE KEY` block.
pub const RSA_ENCRYPTED_PKCS8_PEM: &str = include_str!("../tests/fixtures/rsa_encrypted_pkcs8.pem");
/// [`RSA_CA_KEY_PEM`] with legacy `Proc-Type: 4,ENCRYPTED` headers.
pub const RSA_ENCRYPTED_LEGACY_PEM: &str =
    include_str!("../tests/fixtures/rsa_encrypted_legacy.pem");

/// The fixed RSA root as a complete bundle.
#[must_use]
pub fn rsa_ca_bundle() -> String {
    format!("{RSA_CA_KEY_PEM}{RSA_CA_CERT_PEM}")
}

/// Freshly minted certificate material.
#[derive(Debug, Clone)]
pub struct TestCa {
    /// PEM certificate.
    pub cert_pem: String,
    /// DER certificate.
    pub cert_der: Vec<u8>,
    /// PKCS#8 PEM private key.
    pub key_pem: String,
}

impl TestCa {
    /// Key followed by certificate, the usual bundle layout.
    #[must_use]
    pub fn bundle(&self) -> String {
        format!("{}{}", self.key_pem, self.cert_pem)
    }
}

fn params_for(common_name: &str, is_ca: IsCa) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("certificate params");
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.key_usages = match is_ca {
        IsCa::Ca(_) => vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign],
        _ => vec![KeyUsagePurpose::DigitalSignature],
    };
    params.is_ca = is_ca;
    params
}

fn mint(common_name: &str, alg: &'static SignatureAlgorithm, is_ca: IsCa) -> TestCa {
    let key = KeyPair::generate_for(alg).expect("key generation");
    let cert = params_for(common_name, is_ca).self_signed(&key).expect("self-signed certificate");
    TestCa { cert_pem: cert.pem(), cert_der: cert.der().to_vec(), key_pem: key.serialize_pem() }
}

/// A P-256 CA hierarchy `depth` levels deep, issuing CA first and root last.
///
/// Every level below the root is signed by its parent and carries an
/// authority key identifier equal to the parent's subject key identifier, so
/// `chain[0].bundle()` followed by the remaining certificates in order is a
/// valid bundle with a chain.
#[must_use]
pub fn ec_chain(depth: usize) -> Vec<TestCa> {
    let mut chain = Vec::with_capacity(depth);
    let mut parent: Option<Issuer<'static, KeyPair>> = None;

    for level in 0..depth {
        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key generation");
        let mut params =
            params_for(&format!("Level {level} CA"), IsCa::Ca(BasicConstraints::Unconstrained));
        params.use_authority_key_identifier_extension = parent.is_some();

        let cert = match &parent {
            Some(issuer) => params.signed_by(&key, issuer),
            None => params.self_signed(&key),
        }
        .expect("chain certificate");
        chain.push(TestCa {
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
            key_pem: key.serialize_pem(),
        });
        parent = Some(Issuer::new(params, key));
    }

    chain.reverse();
    chain
}

/// The bundle for `chain[0]` with every other certificate of `chain` as its
/// CA chain, in order.
#[must_use]
pub fn chain_bundle(chain: &[TestCa]) -> String {
    let mut bundle = String::new();
    if let Some((first, rest)) = chain.split_first() {
        bundle.push_str(&first.bundle());
        for ca in rest {
            bundle.push_str(&ca.cert_pem);
        }
    }
    bundle
}

/// A self-signed P-256 CA.
#[must_use]
pub fn ec_ca(common_name: &str) -> TestCa {
    mint(common_name, &PKCS_ECDSA_P256_SHA256, IsCa::Ca(BasicConstraints::Unconstrained))
}

/// A self-signed Ed25519 CA.
#[must_use]
pub fn ed25519_ca(common_name: &str) -> TestCa {
    mint(common_name, &PKCS_ED25519, IsCa::Ca(BasicConstraints::Unconstrained))
}

/// A self-signed end-entity certificate with `CA:FALSE`.
#[must_use]
pub fn leaf(common_name: &str) -> TestCa {
    mint(common_name, &PKCS_ECDSA_P256_SHA256, IsCa::ExplicitNoCa)
}

/// A [`CrlBuilder`] that records every invocation.
#[derive(Debug, Clone, Default)]
pub struct RecordingCrlBuilder {
    calls: Arc<Mutex<Vec<bool>>>,
}

impl RecordingCrlBuilder {
    /// Creates a builder with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rebuilds requested so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The `force_regenerate` flag of every call, in order.
    #[must_use]
    pub fn force_flags(&self) -> Vec<bool> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CrlBuilder for RecordingCrlBuilder {
    async fn build_crl(&self, force_regenerate: bool) -> Result<(), CrlError> {
        self.calls.lock().push(force_regenerate);
        Ok(())
    }
}

/// A [`CrlBuilder`] that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingCrlBuilder {
    attempts: Arc<AtomicUsize>,
}

impl FailingCrlBuilder {
    /// Creates a failing builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rebuilds attempted.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrlBuilder for FailingCrlBuilder {
    async fn build_crl(&self, _force_regenerate: bool) -> Result<(), CrlError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CrlError::new("simulated CRL signing failure"))
    }
}
