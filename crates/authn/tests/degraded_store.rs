//! Behavior while the credential store is failing.
//!
//! A transient outage on first use yields a memory-only key that still signs
//! and verifies within this process. Mutations never commit to the cache
//! unless the store accepted them.
#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use chrono::Utc;
use paygate_authn::{
    AuthError, CredentialConfig, CredentialManager, Durability, RequestHeaders, RequestSigner,
    RotationOutcome, RotationPolicy, SignatureVerifier,
};
use paygate_storage::{
    CredentialStore, StorageError, TenantId,
    testutil::{FailingCredentialStore, make_aged_record},
};

fn tenant() -> TenantId {
    TenantId::from("ak_1")
}

fn manager_over(store: &FailingCredentialStore) -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(Arc::new(store.clone()), CredentialConfig::default()))
}

#[tokio::test]
async fn transient_read_failure_yields_memory_only_key() {
    let store = FailingCredentialStore::new();
    store.set_error(StorageError::timeout());
    store.fail_reads(true);
    let manager = manager_over(&store);

    let lookup = manager.get_or_create(&tenant()).await.expect("degraded lookup");
    assert!(matches!(lookup.durability, Durability::MemoryOnly { .. }));
    assert_eq!(store.write_attempts(), 0, "no write after a failed read");

    let metrics = manager.metrics();
    assert_eq!(metrics.degraded, 1);
    assert_eq!(metrics.created, 1);
    assert!(metrics.store_failures >= 1);
}

#[tokio::test]
async fn memory_only_key_is_stable_and_signs() {
    let store = FailingCredentialStore::new();
    store.fail_reads(true);
    let manager = manager_over(&store);
    let signer = RequestSigner::new(Arc::clone(&manager));
    let verifier = SignatureVerifier::new(Arc::clone(&manager));

    let first = manager.get_active_key(&tenant()).await.expect("key");
    let second = manager.get_active_key(&tenant()).await.expect("key");
    assert_eq!(first.secret(), second.secret(), "degraded key must not be regenerated");

    let signed = signer.sign(&tenant(), "POST", "/v1/payments", b"{}").await.expect("sign");
    assert!(!signed.durability.is_persisted(), "caller must be told the key is not durable");

    verifier
        .verify_request(&RequestHeaders::from(&signed), "POST", "/v1/payments", b"{}", Utc::now())
        .await
        .expect("memory-only key verifies in-process");
}

#[tokio::test]
async fn write_failure_on_create_degrades() {
    let store = FailingCredentialStore::new();
    store.fail_writes(true);
    let manager = manager_over(&store);

    let key = manager.get_active_key(&tenant()).await.expect("degraded key");
    assert!(matches!(key.durability(), Durability::MemoryOnly { reason } if reason.contains("write")));
    assert_eq!(store.write_attempts(), 1);
    assert_eq!(store.successful_writes(), 0);
    assert!(store.inner().is_empty());
}

#[tokio::test]
async fn non_transient_read_failure_is_an_error() {
    let store = FailingCredentialStore::new();
    store.set_error(StorageError::serialization("corrupt record"));
    store.fail_reads(true);
    let manager = manager_over(&store);

    let result = manager.get_active_key(&tenant()).await;
    assert!(
        matches!(result, Err(AuthError::KeyStorage(StorageError::Serialization { .. }))),
        "got: {result:?}"
    );
    assert_eq!(manager.cached_tenant_count(), 0);
    assert_eq!(manager.metrics().degraded, 0);
}

#[tokio::test]
async fn rotation_failure_leaves_active_key_in_place() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("sk_live", 1))).await.expect("seed");
    let manager = manager_over(&store);
    manager.get_active_key(&tenant()).await.expect("cache the key");

    store.fail_writes(true);
    let result = manager.rotate(&tenant(), None).await;
    assert!(matches!(result, Err(AuthError::KeyStorage(_))), "got: {result:?}");

    let key = manager.get_active_key(&tenant()).await.expect("key");
    assert_eq!(key.secret(), "sk_live");
    assert!(key.durability().is_persisted());
    assert_eq!(manager.metrics().rotated, 0);
}

#[tokio::test]
async fn cached_key_keeps_serving_through_outage() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("sk_live", 1))).await.expect("seed");
    let manager = manager_over(&store);
    manager.get_active_key(&tenant()).await.expect("cache the key");

    store.fail_reads(true);
    store.fail_writes(true);
    let key = manager.get_active_key(&tenant()).await.expect("served from cache");
    assert_eq!(key.secret(), "sk_live");
}

#[tokio::test]
async fn invalidate_then_outage_degrades_instead_of_failing() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("sk_live", 1))).await.expect("seed");
    let manager = manager_over(&store);
    manager.get_active_key(&tenant()).await.expect("cache the key");

    manager.invalidate(&tenant()).await;
    store.fail_reads(true);

    let key = manager.get_active_key(&tenant()).await.expect("degraded key");
    assert_ne!(key.secret(), "sk_live");
    assert!(!key.durability().is_persisted());
}

#[tokio::test]
async fn rotation_after_outage_builds_on_stored_key() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("durable-key", 1))).await.expect("seed");
    let manager = manager_over(&store);

    store.set_error(StorageError::timeout());
    store.fail_reads(true);
    let degraded = manager.get_active_key(&tenant()).await.expect("degraded key");
    assert!(!degraded.durability().is_persisted());
    assert_ne!(degraded.secret(), "durable-key");

    store.fail_reads(false);
    let installed = manager.rotate(&tenant(), None).await.expect("rotate");

    let stored = store.inner().get(&tenant()).await.expect("read").expect("record");
    assert_eq!(stored.active(), installed.as_str());
    assert_eq!(stored.previous().collect::<Vec<_>>(), vec!["durable-key"]);
    assert!(!stored.verification_keys().any(|key| key == degraded.secret()));

    let key = manager.get_active_key(&tenant()).await.expect("key");
    assert_eq!(key.secret(), installed.as_str());
    assert!(key.durability().is_persisted());
}

#[tokio::test]
async fn rotation_during_outage_leaves_stored_key_untouched() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("durable-key", 1))).await.expect("seed");
    let manager = manager_over(&store);

    store.set_error(StorageError::timeout());
    store.fail_reads(true);
    manager.get_active_key(&tenant()).await.expect("degraded key");

    let result = manager.rotate(&tenant(), None).await;
    assert!(matches!(result, Err(AuthError::KeyStorage(_))), "got: {result:?}");
    assert_eq!(store.write_attempts(), 0);

    let stored = store.inner().get(&tenant()).await.expect("read").expect("record");
    assert_eq!(stored.active(), "durable-key");
    assert_eq!(stored.previous_len(), 0);
}

#[tokio::test]
async fn policy_check_after_outage_judges_stored_record() {
    let store = FailingCredentialStore::new();
    store.inner().set(&tenant(), Some(&make_aged_record("stale-key", 400))).await.expect("seed");
    let manager = manager_over(&store);
    let policy = RotationPolicy::new(90, 365).expect("policy");

    store.set_error(StorageError::timeout());
    store.fail_reads(true);
    manager.get_active_key(&tenant()).await.expect("degraded key");

    store.fail_reads(false);
    let outcome = manager.check_and_rotate_if_due(&tenant(), policy).await.expect("check");
    assert_eq!(outcome, RotationOutcome::Deleted);
    assert!(store.inner().is_empty());
    assert_eq!(manager.cached_tenant_count(), 0);
}
