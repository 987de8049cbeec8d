//! Shared test utilities for credential store testing.
//!
//! This module provides a fault-injecting store, record factories, and
//! assertion macros for [`StorageResult`] values. It is feature-gated behind
//! `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! paygate-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use paygate_storage::testutil::{FailingCredentialStore, make_aged_record};
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use crate::{
    credential::CredentialRecord,
    error::{StorageError, StorageResult},
    store::{CredentialStore, MemoryCredentialStore},
    types::TenantId,
};

/// Create a deterministic hex-looking secret for tests.
///
/// Produces `"{tag}"` followed by zero padding to 64 characters, so secrets
/// are distinguishable in assertions.
#[must_use]
pub fn make_secret(tag: &str) -> String {
    format!("{tag:0<64}")
}

/// Create a record whose last rotation happened `age_days` ago.
///
/// # Panics
///
/// Panics if `active` is empty.
#[must_use]
pub fn make_aged_record(active: &str, age_days: i64) -> CredentialRecord {
    CredentialRecord::new(active, Utc::now() - Duration::days(age_days)).expect("valid record")
}

/// In-memory store whose reads and writes can be made to fail on demand.
///
/// Failures return the configured error (a connection error by default).
/// Successful and attempted writes are counted so tests can assert that a
/// code path did or did not touch the store.
///
/// Clones share state.
#[derive(Clone)]
pub struct FailingCredentialStore {
    inner: MemoryCredentialStore,
    fail_get: Arc<AtomicBool>,
    fail_set: Arc<AtomicBool>,
    error: Arc<Mutex<StorageError>>,
    set_attempts: Arc<AtomicUsize>,
    set_successes: Arc<AtomicUsize>,
}

impl Default for FailingCredentialStore {
    fn default() -> Self {
        Self {
            inner: MemoryCredentialStore::new(),
            fail_get: Arc::new(AtomicBool::new(false)),
            fail_set: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(StorageError::connection("injected store failure"))),
            set_attempts: Arc::new(AtomicUsize::new(0)),
            set_successes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FailingCredentialStore {
    /// Creates a healthy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `get` calls fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `set` calls fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Sets the error returned by injected failures.
    pub fn set_error(&self, error: StorageError) {
        *self.error.lock() = error;
    }

    /// Number of `set` calls made, including failed ones.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }

    /// Number of `set` calls that were applied.
    #[must_use]
    pub fn successful_writes(&self) -> usize {
        self.set_successes.load(Ordering::SeqCst)
    }

    /// The healthy store underneath, for seeding and inspection.
    #[must_use]
    pub fn inner(&self) -> &MemoryCredentialStore {
        &self.inner
    }
}

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(self.error.lock().clone());
        }
        self.inner.get(tenant).await
    }

    async fn set(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(self.error.lock().clone());
        }
        self.inner.set(tenant, record).await?;
        self.set_successes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Assert that a [`StorageResult`] is an error of the given
/// [`StorageError`] variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use paygate_storage::assert_storage_error;
/// use paygate_storage::{StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::timeout());
/// assert_storage_error!(result, Timeout);
/// ```
#[macro_export]
macro_rules! assert_storage_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::$variant { .. })),
            concat!("expected StorageError::", stringify!($variant), ", got: {:?}"),
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
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

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_make_secret_is_padded() {
        let secret = make_secret("ab");
        assert_eq!(secret.len(), 64);
        assert!(secret.starts_with("ab0"));
    }

    #[test]
    fn test_make_aged_record_age() {
        let record = make_aged_record("aa", 10);
        assert_eq!(record.age(Utc::now()).num_days(), 10);
    }

    #[tokio::test]
    async fn test_failing_store_toggles() {
        let store = FailingCredentialStore::new();
        let tenant = TenantId::from("ak_1");

        store.fail_writes(true);
        let result = store.set(&tenant, Some(&make_aged_record("aa", 0))).await;
        assert_storage_error!(result, Connection);
        assert_eq!(store.write_attempts(), 1);
        assert_eq!(store.successful_writes(), 0);

        store.fail_writes(false);
        assert_storage_ok!(store.set(&tenant, Some(&make_aged_record("aa", 0))).await);
        assert_eq!(store.successful_writes(), 1);

        store.set_error(StorageError::timeout());
        store.fail_reads(true);
        let result = store.get(&tenant).await;
        assert_storage_error!(result, Timeout);
    }

    #[test]
    fn test_assert_storage_ok_macro() {
        let result: StorageResult<i32> = Ok(42);
        assert_eq!(assert_storage_ok!(result), 42);
    }
}
