//! Conformance suite run against `MemoryBackend`.
//!
//! One test per check for fine-grained failure reporting, plus `run_all` to
//! catch checks accidentally left out of the list below.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use keyward_storage::{MemoryBackend, conformance, testutil::FailingBackend};

#[tokio::test]
async fn get_returns_none_for_missing_key() {
    conformance::get_returns_none_for_missing_key(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn set_then_get_returns_value() {
    conformance::set_then_get_returns_value(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn set_overwrites_existing() {
    conformance::set_overwrites_existing(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn delete_semantics() {
    conformance::delete_semantics(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn prefix_scan_is_ordered_and_isolated() {
    conformance::prefix_scan_is_ordered_and_isolated(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn empty_scan_returns_nothing() {
    conformance::empty_scan_returns_nothing(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn json_writes_are_deterministic() {
    conformance::json_writes_are_deterministic(&MemoryBackend::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_last_writer_wins() {
    conformance::concurrent_writers_last_writer_wins(Arc::new(MemoryBackend::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_all_memory() {
    conformance::run_all(MemoryBackend::new).await;
}

/// A failure-injecting wrapper with no failures configured is a conforming backend.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_all_failing_backend_without_failures() {
    conformance::run_all(|| FailingBackend::new(MemoryBackend::new())).await;
}
