//! CA lifecycle core for the Keyward PKI engine.
//!
//! This crate accepts operator-supplied CA material, validates it, persists it
//! through a [`StorageBackend`](keyward_storage::StorageBackend), maintains a
//! registry of issuers with a designated default, and asks the mount's
//! [`CrlBuilder`] to regenerate its revocation list whenever the CA changes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PkiHandlers                            │
//! │   write_ca · read/write issuers config · import issuer      │
//! ├───────────────┬──────────────────┬──────────────────────────┤
//! │    bundle     │     ca_store     │         issuer           │
//! │ parse+validate│ config/ca_bundle │ config/issuers           │
//! │               │ ca               │ config/issuer/<id>       │
//! ├───────────────┴──────────────────┴──────────────────────────┤
//! │        keyward-storage StorageBackend   ·   CrlBuilder      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use keyward_pki::{NoopCrlBuilder, PkiConfig, PkiHandlers, handlers::WriteCaRequest};
//! use keyward_storage::MemoryBackend;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = MemoryBackend::new();
//!     let handlers = PkiHandlers::new(PkiConfig::default(), NoopCrlBuilder);
//!
//!     let pem_bundle = std::fs::read_to_string("ca.pem")?;
//!     let response = handlers.write_ca(&storage, WriteCaRequest { pem_bundle }).await?;
//!     if let Some(message) = response.error_message() {
//!         eprintln!("rejected: {message}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: certificate fixtures, `rcgen`-minted CAs and CRL builder
//!   doubles for downstream tests.
//! - **`failpoints`**: enables the `ca-store-before-raw-cert` fail point
//!   between the two CA writes.

#![deny(unsafe_code)]

pub mod bundle;
pub mod ca_store;
pub mod config;
pub mod crl;
pub mod error;
pub mod handlers;
pub mod issuer;
mod key_match;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;

pub use bundle::{
    CertBundle, Certificate, ParsedCertBundle, ParsedPemBundle, PrivateKey, PrivateKeyType,
    parse_and_validate_ca, parse_pem_bundle,
};
pub use config::{DEFAULT_MAX_PEM_BUNDLE_SIZE, PkiConfig};
pub use crl::{CrlBuilder, CrlError, NoopCrlBuilder};
pub use error::{ErrorKind, PkiError, PkiResult};
pub use handlers::{PkiHandlers, Response};
pub use issuer::{IssuerEntry, IssuerId, IssuersConfig};
