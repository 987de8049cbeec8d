//! Conformance test suite for [`CredentialStore`] implementations.
//!
//! This module provides async test functions that validate whether a
//! [`CredentialStore`] implementation satisfies the trait contract. Every
//! store, in-memory, key/value-backed or external, can run the same suite.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with a
//! fresh store instance:
//!
//! ```no_run
//! use paygate_storage::conformance;
//! use paygate_storage::MemoryCredentialStore;
//!
//! #[tokio::test]
//! async fn get_returns_none_for_unknown_tenant() {
//!     conformance::get_returns_none_for_unknown_tenant(&MemoryCredentialStore::new()).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | CRUD | get/set/delete semantics per tenant |
//! | Fidelity | History order, timestamps and key bytes survive storage |
//! | Concurrent | Thread-safety under parallel access |

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::{CredentialRecord, CredentialStore, TenantId, testutil::make_secret};

fn record(active: &str) -> CredentialRecord {
    CredentialRecord::new(make_secret(active), Utc::now()).expect("valid record")
}

// ============================================================================
// CRUD — get/set/delete semantics
// ============================================================================

/// `get` for a tenant that was never written returns `Ok(None)`.
pub async fn get_returns_none_for_unknown_tenant<S: CredentialStore>(store: &S) {
    let result = store.get(&TenantId::from("conf:ghost")).await;
    assert!(result.is_ok(), "get should not error on unknown tenant: {result:?}");
    assert_eq!(result.expect("checked above"), None);
}

/// `set` then `get` returns an equal record.
pub async fn set_then_get_returns_record<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:crud");
    let written = record("crud");
    store.set(&tenant, Some(&written)).await.expect("set should succeed");
    assert_eq!(store.get(&tenant).await.expect("get"), Some(written));
}

/// A second `set` replaces the first record entirely.
pub async fn set_overwrites_existing<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:overwrite");
    store.set(&tenant, Some(&record("original"))).await.expect("set");
    let updated = record("updated");
    store.set(&tenant, Some(&updated)).await.expect("overwrite");
    assert_eq!(store.get(&tenant).await.expect("get"), Some(updated));
}

/// `set(None)` removes the tenant's record.
pub async fn set_none_deletes_record<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:delete");
    store.set(&tenant, Some(&record("doomed"))).await.expect("set");
    store.set(&tenant, None).await.expect("delete");
    assert_eq!(store.get(&tenant).await.expect("get after delete"), None);
}

/// Deleting a tenant with no record is a silent no-op, and so is deleting twice.
pub async fn delete_is_idempotent<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:idem");
    store.set(&tenant, None).await.expect("delete of unknown tenant should not error");
    store.set(&tenant, Some(&record("idem"))).await.expect("set");
    store.set(&tenant, None).await.expect("first delete");
    store.set(&tenant, None).await.expect("second delete should be noop");
    assert_eq!(store.get(&tenant).await.expect("get"), None);
}

/// Records are isolated per tenant, including tenants whose ids share a prefix.
pub async fn tenants_are_isolated<S: CredentialStore>(store: &S) {
    let short = TenantId::from("conf:ak");
    let long = TenantId::from("conf:ak_1");
    store.set(&short, Some(&record("short"))).await.expect("set short");
    store.set(&long, Some(&record("long"))).await.expect("set long");

    store.set(&short, None).await.expect("delete short");
    assert_eq!(store.get(&short).await.expect("get short"), None);
    assert!(store.get(&long).await.expect("get long").is_some(), "prefix sibling must survive");
}

// ============================================================================
// Fidelity — everything the manager relies on survives a round trip
// ============================================================================

/// Retained keys come back in the order they were stored, newest first.
pub async fn history_order_is_preserved<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:history");
    let mut rotated = record("k0");
    for i in 1..=7 {
        rotated = rotated.rotate(make_secret(&format!("k{i}")), 5, Utc::now()).expect("rotate");
    }
    store.set(&tenant, Some(&rotated)).await.expect("set");

    let loaded = store.get(&tenant).await.expect("get").expect("record");
    assert_eq!(loaded.active(), make_secret("k7"));
    let expected: Vec<String> = (2..=6).rev().map(|i| make_secret(&format!("k{i}"))).collect();
    assert_eq!(loaded.previous().collect::<Vec<_>>(), expected);
}

/// The rotation timestamp survives storage, so age-based policy is stable
/// across restarts.
pub async fn rotation_timestamp_is_preserved<S: CredentialStore>(store: &S) {
    let tenant = TenantId::from("conf:timestamp");
    let rotated_at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).single().expect("valid date")
        + Duration::milliseconds(250);
    let written = CredentialRecord::new(make_secret("ts"), rotated_at).expect("record");
    store.set(&tenant, Some(&written)).await.expect("set");

    let loaded = store.get(&tenant).await.expect("get").expect("record");
    assert_eq!(loaded.last_rotated_at(), rotated_at);
}

/// Tenant ids with separators and non-ASCII characters are stored verbatim.
pub async fn unusual_tenant_ids_round_trip<S: CredentialStore>(store: &S) {
    for id in ["conf/with/slashes", "conf:ünïcödé", "conf with spaces"] {
        let tenant = TenantId::from(id);
        let written = record(id);
        store.set(&tenant, Some(&written)).await.expect("set");
        assert_eq!(store.get(&tenant).await.expect("get"), Some(written), "tenant {id:?}");
    }
}

// ============================================================================
// Concurrent — thread-safety under parallel access
// ============================================================================

/// Parallel writes to distinct tenants are all applied.
pub async fn concurrent_sets_to_different_tenants<S: CredentialStore + 'static>(store: Arc<S>) {
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let tenant = TenantId::from(format!("conf:par:{i}"));
            store.set(&tenant, Some(&record(&format!("par{i}")))).await.expect("set");
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    for i in 0..16 {
        let tenant = TenantId::from(format!("conf:par:{i}"));
        let loaded = store.get(&tenant).await.expect("get").expect("record");
        assert_eq!(loaded.active(), make_secret(&format!("par{i}")));
    }
}

/// Concurrent readers see the same record.
pub async fn concurrent_reads_return_consistent_record<S: CredentialStore + 'static>(
    store: Arc<S>,
) {
    let tenant = TenantId::from("conf:read");
    let written = record("read");
    store.set(&tenant, Some(&written)).await.expect("set");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let tenant = tenant.clone();
        handles.push(tokio::spawn(async move { store.get(&tenant).await.expect("get") }));
    }
    for handle in handles {
        assert_eq!(handle.await.expect("task panicked"), Some(written.clone()));
    }
}

// ============================================================================
// Convenience runner — run all conformance tests against a single store
// ============================================================================

/// Run the full conformance suite against the given store.
///
/// Tests use distinct tenant ids, so a single store instance can be shared
/// across the whole suite.
pub async fn run_all<S: CredentialStore + 'static>(store: Arc<S>) {
    // CRUD
    get_returns_none_for_unknown_tenant(store.as_ref()).await;
    set_then_get_returns_record(store.as_ref()).await;
    set_overwrites_existing(store.as_ref()).await;
    set_none_deletes_record(store.as_ref()).await;
    delete_is_idempotent(store.as_ref()).await;
    tenants_are_isolated(store.as_ref()).await;

    // Fidelity
    history_order_is_preserved(store.as_ref()).await;
    rotation_timestamp_is_preserved(store.as_ref()).await;
    unusual_tenant_ids_round_trip(store.as_ref()).await;

    // Concurrent
    concurrent_sets_to_different_tenants(Arc::clone(&store)).await;
    concurrent_reads_return_consistent_record(Arc::clone(&store)).await;
}
