//! Partial-failure behaviour of the multi-key CA write.
//!
//! The storage port has no transaction, so these tests pin down what state is
//! left behind when a write or the CRL rebuild fails part way, and that
//! resubmitting the same request repairs it.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use keyward_pki::{
    ErrorKind, PkiConfig, PkiError, PkiHandlers, Response,
    ca_store::{self, CA_BUNDLE_KEY, CA_CERT_KEY},
    handlers::{IssuersConfigData, WriteCaRequest},
    issuer::ISSUERS_CONFIG_KEY,
    testutil::{self, FailingCrlBuilder, RecordingCrlBuilder},
};
use keyward_storage::{MemoryBackend, testutil::FailingBackend};

fn request(pem_bundle: String) -> WriteCaRequest {
    WriteCaRequest { pem_bundle }
}

#[tokio::test]
async fn raw_certificate_failure_leaves_bundle_written() {
    let inner = MemoryBackend::new();
    let storage = FailingBackend::new(inner.clone()).fail_set_on(CA_CERT_KEY);
    let handlers = PkiHandlers::new(PkiConfig::default(), RecordingCrlBuilder::new());
    let ca = testutil::ec_ca("Root");

    let err = handlers.write_ca(&storage, request(ca.bundle())).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err, PkiError::Storage(_)));
    assert!(inner.snapshot().contains_key(CA_BUNDLE_KEY.as_bytes()));
    assert!(!inner.snapshot().contains_key(CA_CERT_KEY.as_bytes()));
    assert_eq!(handlers.crl_builder().call_count(), 0, "no CRL rebuild after a failed write");
}

#[tokio::test]
async fn stale_certificate_is_repaired_by_retry() {
    let inner = MemoryBackend::new();
    let handlers = PkiHandlers::new(PkiConfig::default(), RecordingCrlBuilder::new());
    let old = testutil::ec_ca("Old");
    let new = testutil::ec_ca("New");

    handlers.write_ca(&inner, request(old.bundle())).await.unwrap();

    let storage = FailingBackend::new(inner.clone()).fail_set_on(CA_CERT_KEY);
    handlers.write_ca(&storage, request(new.bundle())).await.unwrap_err();

    let stale = ca_store::fetch_ca_certificate(&inner).await.unwrap();
    assert_eq!(stale, Some(old.cert_der.clone()), "raw certificate still belongs to the old CA");
    let bundle = ca_store::fetch_ca_bundle(&inner).await.unwrap().unwrap();
    assert_eq!(bundle.to_parsed().unwrap().certificate_bytes(), new.cert_der.as_slice());

    storage.heal();
    let response = handlers.write_ca(&storage, request(new.bundle())).await.unwrap();

    assert_eq!(response, Response::NoContent);
    assert_eq!(ca_store::fetch_ca_certificate(&inner).await.unwrap(), Some(new.cert_der));
    assert_eq!(handlers.crl_builder().force_flags(), vec![true, true]);
}

#[tokio::test]
async fn crl_failure_keeps_committed_writes() {
    let storage = MemoryBackend::new();
    let handlers = PkiHandlers::new(PkiConfig::default(), FailingCrlBuilder::new());
    let ca = testutil::ed25519_ca("Root");

    let err = handlers.write_ca(&storage, request(ca.bundle())).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err, PkiError::Crl(_)));
    assert_eq!(handlers.crl_builder().attempts(), 1);
    assert_eq!(ca_store::fetch_ca_certificate(&storage).await.unwrap(), Some(ca.cert_der));
    assert!(ca_store::fetch_ca_bundle(&storage).await.unwrap().is_some());
}

#[tokio::test]
async fn bundle_write_failure_changes_nothing() {
    let inner = MemoryBackend::new();
    let storage = FailingBackend::new(inner.clone()).fail_set_on(CA_BUNDLE_KEY);
    let handlers = PkiHandlers::new(PkiConfig::default(), RecordingCrlBuilder::new());

    let result = handlers.write_ca(&storage, request(testutil::rsa_ca_bundle())).await;

    assert!(result.is_err());
    assert!(inner.is_empty());
    assert_eq!(storage.set_calls(), 1, "second write must not be attempted");
}

#[tokio::test]
async fn issuers_config_read_failure_is_internal() {
    let storage = FailingBackend::new(MemoryBackend::new()).fail_get_on(ISSUERS_CONFIG_KEY);
    let handlers = PkiHandlers::new(PkiConfig::default(), RecordingCrlBuilder::new());

    let err = handlers.read_issuers_config(&storage).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let err = handlers
        .write_issuers_config(&storage, IssuersConfigData { default: "default".into() })
        .await
        .map(|response| response.error_message().map(str::to_owned));
    assert!(
        matches!(err, Ok(Some(_))),
        "value validation happens before any storage access: {err:?}"
    );
}

#[tokio::test]
async fn issuers_config_write_failure_is_internal() {
    let inner = MemoryBackend::new();
    let handlers = PkiHandlers::new(PkiConfig::default(), RecordingCrlBuilder::new());
    let ca = testutil::ec_ca("alpha");
    let parsed = keyward_pki::parse_and_validate_ca(&ca.bundle(), &PkiConfig::default()).unwrap();
    keyward_pki::issuer::import_issuer(&inner, &parsed, "alpha").await.unwrap();

    let storage = FailingBackend::new(inner.clone()).fail_set_on(ISSUERS_CONFIG_KEY);
    let err = handlers
        .write_issuers_config(&storage, IssuersConfigData { default: "alpha".into() })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!inner.snapshot().contains_key(ISSUERS_CONFIG_KEY.as_bytes()));
}
