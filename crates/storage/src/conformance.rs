//! Conformance checks for [`StorageBackend`] implementations.
//!
//! Any backend handed to the PKI engine must pass these. Each function takes a
//! fresh, empty backend and panics with a descriptive message on violation.
//!
//! ```no_run
//! use keyward_storage::{MemoryBackend, conformance};
//!
//! #[tokio::test]
//! async fn get_returns_none_for_missing_key() {
//!     conformance::get_returns_none_for_missing_key(&MemoryBackend::new()).await;
//! }
//! ```
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | CRUD | get/set/delete semantics, overwrite |
//! | Range | ordering, prefix isolation |
//! | JSON | typed helpers are deterministic |
//! | Concurrent | last-writer-wins on a single key |

use std::sync::Arc;

use bytes::Bytes;

use crate::{backend::StorageBackend, types::prefix_range};

// ============================================================================
// CRUD
// ============================================================================

/// `get` on a missing key returns `Ok(None)`.
pub async fn get_returns_none_for_missing_key<B: StorageBackend>(backend: &B) {
    let result = backend.get(b"ca").await;
    assert!(result.is_ok(), "get should not error on missing key: {result:?}");
    assert_eq!(result.expect("checked above"), None, "missing key should return None");
}

/// `set` then `get` round-trips the exact bytes.
pub async fn set_then_get_returns_value<B: StorageBackend>(backend: &B) {
    let der = vec![0x30, 0x82, 0x01, 0x0a, 0x00, 0xff];
    backend.set(b"ca".to_vec(), der.clone()).await.expect("set should succeed");
    let val = backend.get(b"ca").await.expect("get should succeed");
    assert_eq!(val, Some(Bytes::from(der)));
}

/// `set` on an existing key replaces the value wholesale.
pub async fn set_overwrites_existing<B: StorageBackend>(backend: &B) {
    backend.set(b"config/ca_bundle".to_vec(), b"first-bundle".to_vec()).await.expect("set");
    backend.set(b"config/ca_bundle".to_vec(), b"second".to_vec()).await.expect("overwrite");
    let val = backend.get(b"config/ca_bundle").await.expect("get");
    assert_eq!(val, Some(Bytes::from("second")), "overwrite must not leave stale suffix bytes");
}

/// `delete` removes a key and deleting a missing key is a no-op.
pub async fn delete_semantics<B: StorageBackend>(backend: &B) {
    backend.delete(b"ghost").await.expect("delete of missing key should not error");
    backend.set(b"k".to_vec(), b"v".to_vec()).await.expect("set");
    backend.delete(b"k").await.expect("delete");
    assert_eq!(backend.get(b"k").await.expect("get after delete"), None);
}

// ============================================================================
// Range
// ============================================================================

/// A prefix scan returns matching keys in order and nothing else.
pub async fn prefix_scan_is_ordered_and_isolated<B: StorageBackend>(backend: &B) {
    for key in ["config/issuer/c", "config/issuer/a", "config/issuers", "config/issuer/b", "ca"] {
        backend.set(key.as_bytes().to_vec(), b"v".to_vec()).await.expect("set");
    }
    let results = backend.get_range(prefix_range(b"config/issuer/")).await.expect("get_range");
    let keys: Vec<&[u8]> = results.iter().map(|kv| kv.key.as_ref()).collect();
    assert_eq!(
        keys,
        vec![b"config/issuer/a".as_slice(), b"config/issuer/b", b"config/issuer/c"],
        "prefix scan must be sorted and exclude sibling keys"
    );
}

/// A scan over an empty prefix range returns an empty vector.
pub async fn empty_scan_returns_nothing<B: StorageBackend>(backend: &B) {
    let results = backend.get_range(prefix_range(b"config/issuer/")).await.expect("get_range");
    assert!(results.is_empty(), "empty store should scan to nothing: {results:?}");
}

// ============================================================================
// JSON
// ============================================================================

/// Writing the same JSON value twice yields byte-identical entries.
pub async fn json_writes_are_deterministic<B: StorageBackend>(backend: &B) {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        certificate: &'a str,
        serial_number: &'a str,
    }

    let entry = Entry { certificate: "-----BEGIN CERTIFICATE-----", serial_number: "01:02" };
    backend.set_json(b"j".to_vec(), &entry).await.expect("first write");
    let first = backend.get(b"j").await.expect("get").expect("present");
    backend.set_json(b"j".to_vec(), &entry).await.expect("second write");
    let second = backend.get(b"j").await.expect("get").expect("present");
    assert_eq!(first, second);
}

// ============================================================================
// Concurrent
// ============================================================================

/// Concurrent writers to one key leave exactly one of their values behind.
pub async fn concurrent_writers_last_writer_wins<B: StorageBackend + 'static>(backend: Arc<B>) {
    let mut handles = Vec::new();
    for task in 0..8u8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            backend.set(b"config/issuers".to_vec(), vec![task; 32]).await.expect("set");
        }));
    }
    for handle in handles {
        handle.await.expect("writer task panicked");
    }

    let value = backend.get(b"config/issuers").await.expect("get").expect("present");
    let first = value[0];
    assert!(first < 8, "value must come from one of the writers");
    assert!(value.iter().all(|&b| b == first), "value must not interleave writers");
}

/// Runs every check, each against a backend produced by `factory`.
pub async fn run_all<B, F>(factory: F)
where
    B: StorageBackend + 'static,
    F: Fn() -> B,
{
    get_returns_none_for_missing_key(&factory()).await;
    set_then_get_returns_value(&factory()).await;
    set_overwrites_existing(&factory()).await;
    delete_semantics(&factory()).await;
    prefix_scan_is_ordered_and_isolated(&factory()).await;
    empty_scan_returns_nothing(&factory()).await;
    json_writes_are_deterministic(&factory()).await;
    concurrent_writers_last_writer_wins(Arc::new(factory())).await;
}
