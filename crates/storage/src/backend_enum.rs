//! Runtime-selectable credential store.
//!
//! [`CredentialStoreBackend`] lets configuration pick between the in-memory
//! default and an externally supplied store while callers hold a single
//! concrete type.
//!
//! | Variant | Persistence |
//! |---------|-------------|
//! | [`CredentialStoreBackend::Memory`] | Process lifetime only |
//! | [`CredentialStoreBackend::External`] | Whatever the wrapped store provides |
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use paygate_storage::{
//!     CredentialStoreBackend, KeyValueCredentialStore, MemoryBackend,
//! };
//!
//! let default_store = CredentialStoreBackend::memory();
//! assert!(default_store.is_memory());
//!
//! let external = CredentialStoreBackend::external(Arc::new(
//!     KeyValueCredentialStore::new(MemoryBackend::new()),
//! ));
//! assert!(!external.is_memory());
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    credential::CredentialRecord, error::StorageResult, store::CredentialStore,
    store::MemoryCredentialStore, types::TenantId,
};

/// Credential store selected at construction time.
#[derive(Clone)]
pub enum CredentialStoreBackend {
    /// In-memory store; records do not survive a restart.
    Memory(MemoryCredentialStore),
    /// Caller-supplied durable store.
    External(Arc<dyn CredentialStore>),
}

impl CredentialStoreBackend {
    /// Creates a fresh in-memory backend.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryCredentialStore::new())
    }

    /// Wraps an external store.
    #[must_use]
    pub fn external(store: Arc<dyn CredentialStore>) -> Self {
        Self::External(store)
    }

    /// Returns true if this is the in-memory backend.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }
}

impl Default for CredentialStoreBackend {
    fn default() -> Self {
        Self::memory()
    }
}

#[async_trait]
impl CredentialStore for CredentialStoreBackend {
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>> {
        match self {
            Self::Memory(s) => s.get(tenant).await,
            Self::External(s) => s.get(tenant).await,
        }
    }

    async fn set(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.set(tenant, record).await,
            Self::External(s) => s.set(tenant, record).await,
        }
    }
}

impl std::fmt::Debug for CredentialStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory(_) => write!(f, "CredentialStoreBackend::Memory"),
            Self::External(_) => write!(f, "CredentialStoreBackend::External"),
        }
    }
}
