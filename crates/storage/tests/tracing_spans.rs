//! Verifies that `MemoryBackend` operations emit the expected tracing spans.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use keyward_storage::{MemoryBackend, StorageBackend, prefix_range};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer — records span names as they are created
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crud_operations_produce_distinct_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = MemoryBackend::new();
    backend.set(b"ca".to_vec(), b"der".to_vec()).await.expect("set");
    let _ = backend.get(b"ca").await;
    backend.delete(b"ca").await.expect("delete");
    let _ = backend.get_range(prefix_range(b"config/issuer/")).await;

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["set", "get", "delete", "get_range"] {
        assert!(
            recorded.iter().any(|s| s == name),
            "missing span '{name}', recorded: {recorded:?}"
        );
    }
}

#[tokio::test]
async fn json_helpers_go_through_instrumented_primitives() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = MemoryBackend::new();
    let config = serde_json::json!({ "default": "" });
    backend.set_json(b"config/issuers".to_vec(), &config).await.expect("set_json");
    let _: Option<serde_json::Value> =
        backend.get_json(b"config/issuers").await.expect("get_json");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "set"), "expected a 'set' span, got: {recorded:?}");
    assert!(recorded.iter().any(|s| s == "get"), "expected a 'get' span, got: {recorded:?}");
}
