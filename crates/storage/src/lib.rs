//! Storage port for the Keyward PKI engine.
//!
//! This crate provides the [`StorageBackend`] trait that the CA lifecycle
//! code is written against, and [`MemoryBackend`], an in-memory implementation
//! for tests and development.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  keyward-pki handlers                       │
//! │     (CA write, issuers config read/write, issuer import)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 keyward-storage                             │
//! │              StorageBackend trait                           │
//! │        (get, set, delete, get_range, JSON helpers)          │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBackend│         engine-provided backends             │
//! │   (testing)  │            (production)                      │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! The port is deliberately single-key: there is no transaction. Code that
//! writes several related keys owns the ordering and the recovery story.
//!
//! # Quick Start
//!
//! ```
//! use keyward_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"ca".to_vec(), b"der".to_vec()).await?;
//!
//!     let value = backend.get(b"ca").await?;
//!     assert_eq!(value.map(|b| b.to_vec()), Some(b"der".to_vec()));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: enables the `testutil` module (a failure-injecting backend
//!   and assertion macros) and the `conformance` checks for integration tests.

#![deny(unsafe_code)]

pub mod backend;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod memory;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod types;

pub use backend::StorageBackend;
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use size_limits::{
    DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, SizeLimits, validate_key_size, validate_sizes,
};
pub use types::{KeyValue, prefix_range};
