//! In-memory storage backend implementation.
//!
//! [`MemoryBackend`] keeps entries in a [`BTreeMap`] behind a
//! [`parking_lot::RwLock`]. It is the backend used by the test suites and by
//! development setups; nothing is persisted.
//!
//! # Example
//!
//! ```
//! use keyward_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"config/issuers".to_vec(), br#"{"default":""}"#.to_vec()).await.unwrap();
//!     let value = backend.get(b"config/issuers").await.unwrap();
//!
//!     assert!(value.is_some());
//! }
//! ```
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | get | O(log n) |
//! | set | O(log n) |
//! | delete | O(log n) |
//! | get_range | O(log n + k) where k is result size |

use std::{
    collections::BTreeMap,
    ops::{Bound, RangeBounds},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    error::StorageResult,
    size_limits::{SizeLimits, validate_key_size, validate_sizes},
    types::KeyValue,
};

/// In-memory storage backend using [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryBackend` is cheaply cloneable. All clones share the same data, which
/// lets tests hand one clone to the code under test and inspect another.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
    limits: SizeLimits,
}

impl MemoryBackend {
    /// Creates an empty backend with default [`SizeLimits`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend that enforces the given size limits on writes.
    #[must_use]
    pub fn with_size_limits(limits: SizeLimits) -> Self {
        Self { data: Arc::default(), limits }
    }

    /// Returns a copy of every entry currently stored.
    ///
    /// Intended for assertions that compare whole-store state before and
    /// after an operation.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Bytes> {
        self.data.read().clone()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the backend holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.len())
            .field("limits", &self.limits)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip_all, fields(key = %String::from_utf8_lossy(key)))]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        validate_key_size(key, &self.limits)?;
        Ok(self.data.read().get(key).cloned())
    }

    #[tracing::instrument(skip_all, fields(key = %String::from_utf8_lossy(&key), len = value.len()))]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        validate_sizes(&key, &value, &self.limits)?;
        self.data.write().insert(key, Bytes::from(value));
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(key = %String::from_utf8_lossy(key)))]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        validate_key_size(key, &self.limits)?;
        self.data.write().remove(key);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        let start = match range.start_bound() {
            Bound::Included(b) => Bound::Included(b.as_slice()),
            Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let end = match range.end_bound() {
            Bound::Included(b) => Bound::Included(b.as_slice()),
            Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((start, end))
            .map(|(k, v)| KeyValue::new(Bytes::copy_from_slice(k), v.clone()))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{StorageError, prefix_range};

    #[tokio::test]
    async fn set_then_get() {
        let backend = MemoryBackend::new();
        backend.set(b"ca".to_vec(), b"cert".to_vec()).await.unwrap();
        assert_eq!(backend.get(b"ca").await.unwrap(), Some(Bytes::from("cert")));
    }

    #[tokio::test]
    async fn set_overwrites() {
        let backend = MemoryBackend::new();
        backend.set(b"ca".to_vec(), b"old".to_vec()).await.unwrap();
        backend.set(b"ca".to_vec(), b"new".to_vec()).await.unwrap();
        assert_eq!(backend.get(b"ca").await.unwrap(), Some(Bytes::from("new")));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let backend = MemoryBackend::new();
        backend.delete(b"missing").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn clones_share_data() {
        let backend = MemoryBackend::new();
        let observer = backend.clone();
        backend.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        assert_eq!(observer.get(b"k").await.unwrap(), Some(Bytes::from("v")));
    }

    #[tokio::test]
    async fn prefix_scan_returns_only_matching_keys_in_order() {
        let backend = MemoryBackend::new();
        for key in ["config/issuer/b", "config/issuers", "config/issuer/a", "ca"] {
            backend.set(key.as_bytes().to_vec(), b"x".to_vec()).await.unwrap();
        }

        let entries = backend.get_range(prefix_range(b"config/issuer/")).await.unwrap();
        let keys: Vec<_> = entries.iter().filter_map(KeyValue::key_str).collect();
        assert_eq!(keys, ["config/issuer/a", "config/issuer/b"]);
    }

    #[tokio::test]
    async fn oversized_value_is_rejected_without_write() {
        let backend = MemoryBackend::with_size_limits(SizeLimits::new(16, 4).unwrap());
        let err = backend.set(b"ca".to_vec(), vec![0u8; 5]).await.unwrap_err();
        assert!(matches!(err, StorageError::SizeLimitExceeded { kind: "value", .. }));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn snapshot_reflects_current_state() {
        let backend = MemoryBackend::new();
        backend.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        let snap = backend.snapshot();
        assert_eq!(snap.get(b"a".as_slice()), Some(&Bytes::from("1")));
    }

    #[tokio::test]
    async fn json_helpers_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Entry {
            default: String,
        }

        let backend = MemoryBackend::new();
        let entry = Entry { default: "issuer-1".into() };
        backend.set_json(b"config/issuers".to_vec(), &entry).await.unwrap();

        let decoded: Option<Entry> = backend.get_json(b"config/issuers").await.unwrap();
        assert_eq!(decoded, Some(entry));
    }

    #[tokio::test]
    async fn get_json_reports_corrupt_entries() {
        let backend = MemoryBackend::new();
        backend.set(b"config/issuers".to_vec(), b"not json".to_vec()).await.unwrap();

        let result: StorageResult<Option<serde_json::Value>> =
            backend.get_json(b"config/issuers").await;
        assert!(matches!(result, Err(StorageError::Serialization { .. })));
    }
}
