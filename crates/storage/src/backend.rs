//! Storage backend trait definition.
//!
//! [`StorageBackend`] is the port the PKI engine is written against. It is a
//! flat key-value namespace with single-key writes only: there is no
//! transaction and no multi-key atomicity. Callers that write several related
//! keys must order the writes so that a partial failure is recoverable by
//! repeating the whole operation.
//!
//! Implementing a backend:
//!
//! 1. Implement the four required methods.
//! 2. Map backend-specific failures onto [`StorageError`].
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation.

use std::ops::RangeBounds;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{StorageError, StorageResult},
    types::KeyValue,
};

/// Abstract storage backend for key-value operations.
///
/// Backends are shared by many concurrent requests and must be `Send + Sync`.
/// Concurrent `set` calls on the same key are last-writer-wins.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](StorageBackend::get) | Retrieve a single value by key |
/// | [`set`](StorageBackend::set) | Store (or overwrite) a key-value pair |
/// | [`delete`](StorageBackend::delete) | Remove a key |
/// | [`get_range`](StorageBackend::get_range) | Ordered scan over a key range |
/// | [`get_json`](StorageBackend::get_json) | Typed read of a JSON value |
/// | [`set_json`](StorageBackend::set_json) | Typed write of a JSON value |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use keyward_storage::{MemoryBackend, StorageBackend};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let backend = MemoryBackend::new();
///
/// backend.set(b"ca".to_vec(), b"der-bytes".to_vec()).await.unwrap();
/// let value = backend.get(b"ca").await.unwrap();
/// assert_eq!(value, Some(Bytes::from("der-bytes")));
/// # });
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Stores a key-value pair, overwriting any existing value.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Deletes a key. Deleting a missing key is a no-op.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Retrieves all key-value pairs within a range, in key order.
    ///
    /// Combine with [`prefix_range`](crate::prefix_range) to list every key
    /// under a prefix.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send;

    /// Reads and decodes a JSON value.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Serialization`] if the stored bytes are not valid JSON for `T`.
    /// - Any error from [`get`](StorageBackend::get).
    async fn get_json<T>(&self, key: &[u8]) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StorageError::serialization_with_source(
                    format!("failed to decode entry {}", String::from_utf8_lossy(key)),
                    e,
                )
            }),
            None => Ok(None),
        }
    }

    /// Encodes `value` as JSON and stores it.
    ///
    /// Struct fields serialize in declaration order, so writing the same value
    /// twice produces byte-identical entries.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Serialization`] if `value` cannot be encoded.
    /// - Any error from [`set`](StorageBackend::set).
    async fn set_json<T>(&self, key: Vec<u8>, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| {
            StorageError::serialization_with_source(
                format!("failed to encode entry {}", String::from_utf8_lossy(&key)),
                e,
            )
        })?;
        self.set(key, bytes).await
    }
}
