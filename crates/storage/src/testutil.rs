//! Shared test utilities for code written against [`StorageBackend`].
//!
//! Feature-gated behind `testutil` so none of this reaches production builds.
//!
//! ```toml
//! [dev-dependencies]
//! keyward-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::{
    collections::HashSet,
    ops::RangeBounds,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    StorageBackend,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
    types::KeyValue,
};

/// A [`MemoryBackend`] wrapper that injects failures on chosen keys and
/// counts every write it sees.
///
/// Writes to a key listed with [`fail_set_on`](Self::fail_set_on) return
/// [`StorageError::Connection`] without touching the inner backend; reads of a
/// key listed with [`fail_get_on`](Self::fail_get_on) fail the same way.
/// Failure sets can be cleared with [`heal`](Self::heal) to model a retry
/// after the outage ends.
#[derive(Clone, Default)]
pub struct FailingBackend {
    inner: MemoryBackend,
    fail_sets: Arc<Mutex<HashSet<Vec<u8>>>>,
    fail_gets: Arc<Mutex<HashSet<Vec<u8>>>>,
    set_calls: Arc<AtomicUsize>,
}

impl FailingBackend {
    /// Wraps `inner`. Clones of `inner` observe every successful write.
    #[must_use]
    pub fn new(inner: MemoryBackend) -> Self {
        Self { inner, ..Self::default() }
    }

    /// Makes every subsequent `set` of `key` fail.
    #[must_use]
    pub fn fail_set_on(self, key: &str) -> Self {
        self.fail_sets.lock().insert(key.as_bytes().to_vec());
        self
    }

    /// Makes every subsequent `get` of `key` fail.
    #[must_use]
    pub fn fail_get_on(self, key: &str) -> Self {
        self.fail_gets.lock().insert(key.as_bytes().to_vec());
        self
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.fail_sets.lock().clear();
        self.fail_gets.lock().clear();
    }

    /// Number of `set` calls attempted, including failed ones.
    #[must_use]
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// The wrapped backend.
    #[must_use]
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        if self.fail_gets.lock().contains(key) {
            return Err(StorageError::connection("simulated read failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.lock().contains(&key) {
            return Err(StorageError::connection("simulated write failure"));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        self.inner.get_range(range).await
    }
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is `Ok` and return the inner value.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}
