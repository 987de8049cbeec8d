//! Storage trait for per-tenant credential records.
//!
//! [`CredentialStore`] is the durable side of credential management. The
//! credential manager owns the in-memory cache; a store only persists and
//! returns whole records keyed by [`TenantId`].
//!
//! # Record Lifecycle
//!
//! ```text
//!              set(Some)                 set(Some)
//! ┌─────────┐ ────────────► ┌─────────┐ ◄──────────┐
//! │ Absent  │               │ Active  │ ───────────┘ (rotation)
//! └─────────┘ ◄──────────── └─────────┘
//!              set(None)
//!              (expiry)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use paygate_storage::{CredentialRecord, CredentialStore, StorageError, TenantId};
//!
//! async fn persist<S: CredentialStore>(
//!     store: &S,
//!     tenant: &TenantId,
//!     record: &CredentialRecord,
//! ) -> Result<(), StorageError> {
//!     store.set(tenant, Some(record)).await
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{credential::CredentialRecord, error::StorageResult, types::TenantId};

/// Persistence layer for credential records.
///
/// # Concurrency
///
/// Implementations provide no concurrency control of their own. The
/// credential manager serializes every write for a given tenant, so a store
/// only has to be safe to call from multiple tasks (`Send + Sync`).
///
/// # Error Handling
///
/// Either operation may fail with a [`StorageError`](crate::StorageError).
/// A failed `set` must leave the previously stored record untouched; stores
/// never apply a write partially.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetches the record for `tenant`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if a record is stored
    /// - `Ok(None)` if the tenant has no record
    /// - `Err(...)` on storage errors
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>>;

    /// Replaces the record for `tenant`.
    ///
    /// Passing `None` deletes the tenant's record. Deleting an absent record
    /// succeeds.
    async fn set(&self, tenant: &TenantId, record: Option<&CredentialRecord>)
    -> StorageResult<()>;
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>> {
        (**self).get(tenant).await
    }

    async fn set(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        (**self).set(tenant, record).await
    }
}

/// In-memory implementation of [`CredentialStore`].
///
/// This is the default store for callers that supply no external one.
/// Records live only as long as the process; nothing survives a restart.
///
/// # Cloning
///
/// Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use paygate_storage::{CredentialRecord, CredentialStore, MemoryCredentialStore, TenantId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryCredentialStore::new();
///     let tenant = TenantId::from("ak_1");
///
///     let record = CredentialRecord::new("00ff", Utc::now())?;
///     store.set(&tenant, Some(&record)).await?;
///
///     assert_eq!(store.get(&tenant).await?, Some(record));
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<TenantId, CredentialRecord>>>,
}

impl MemoryCredentialStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tenants with a stored record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>> {
        Ok(self.records.read().get(tenant).cloned())
    }

    #[tracing::instrument(skip(self, record), fields(tenant = %tenant, delete = record.is_none()))]
    async fn set(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        let mut records = self.records.write();
        match record {
            Some(record) => {
                records.insert(tenant.clone(), record.clone());
            },
            None => {
                records.remove(tenant);
            },
        }
        Ok(())
    }
}
