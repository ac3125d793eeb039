//! Verifies that handler, store and registry operations emit spans and that
//! span fields never carry key material.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use keyward_pki::{
    NoopCrlBuilder, PkiConfig, PkiHandlers,
    handlers::{IssuersConfigData, WriteCaRequest},
    testutil,
};
use keyward_storage::MemoryBackend;
use tracing::{
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer — records span names and their field values
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FieldRecorder(Vec<String>);

impl Visit for FieldRecorder {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.push(format!("{}={value:?}", field.name()));
    }
}

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut fields = FieldRecorder::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push((span.name().to_owned(), fields.0));
        }
    }
}

impl SpanCollector {
    fn names(&self) -> Vec<String> {
        self.spans.lock().expect("lock poisoned").iter().map(|(name, _)| name.clone()).collect()
    }

    fn all_fields(&self) -> String {
        self.spans
            .lock()
            .expect("lock poisoned")
            .iter()
            .flat_map(|(_, fields)| fields.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ca_write_emits_handler_store_and_backend_spans() {
    let collector = SpanCollector::default();
    let subscriber = tracing_subscriber::registry().with(collector.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let storage = MemoryBackend::new();
    let handlers = PkiHandlers::new(PkiConfig::default(), NoopCrlBuilder);
    let ca = testutil::ec_ca("Traced Root");
    handlers
        .write_ca(&storage, WriteCaRequest { pem_bundle: ca.bundle() })
        .await
        .expect("write_ca");

    let names = collector.names();
    for expected in ["write_ca", "set"] {
        assert!(names.iter().any(|n| n == expected), "missing span '{expected}': {names:?}");
    }
    assert!(
        names.iter().filter(|n| *n == "write_ca").count() >= 2,
        "handler and store spans both expected: {names:?}"
    );

    let fields = collector.all_fields();
    assert!(fields.contains("serial="), "serial should be recorded: {fields}");
    assert!(!fields.contains("PRIVATE KEY"), "key material leaked into spans: {fields}");
}

#[tokio::test]
async fn issuers_config_write_emits_registry_spans() {
    let collector = SpanCollector::default();
    let subscriber = tracing_subscriber::registry().with(collector.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let storage = MemoryBackend::new();
    let handlers = PkiHandlers::new(PkiConfig::default(), NoopCrlBuilder);
    let _ = handlers
        .write_issuers_config(&storage, IssuersConfigData { default: "alpha".into() })
        .await
        .expect("write_issuers_config");

    let names = collector.names();
    for expected in ["write_issuers_config", "resolve_issuer_reference", "list_issuers", "get_range"]
    {
        assert!(names.iter().any(|n| n == expected), "missing span '{expected}': {names:?}");
    }
    assert!(collector.all_fields().contains("reference=alpha"));
}
