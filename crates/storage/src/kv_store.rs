//! [`CredentialStore`] adapter over any [`KeyValueBackend`].
//!
//! Records are serialized as JSON and stored under
//! `credentials/{tenant}`. A deletion removes the key.

use async_trait::async_trait;

use crate::{
    backend::KeyValueBackend,
    credential::CredentialRecord,
    error::{StorageError, StorageResult},
    store::CredentialStore,
    types::TenantId,
};

/// Key prefix under which credential records are stored.
pub const CREDENTIAL_KEY_PREFIX: &str = "credentials/";

/// External-store adapter persisting credential records in a key/value
/// backend.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use paygate_storage::{
///     CredentialRecord, CredentialStore, KeyValueCredentialStore, MemoryBackend, TenantId,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = KeyValueCredentialStore::new(MemoryBackend::new());
///     let tenant = TenantId::from("ak_1");
///
///     store.set(&tenant, Some(&CredentialRecord::new("00ff", Utc::now())?)).await?;
///     assert!(store.get(&tenant).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KeyValueCredentialStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> KeyValueCredentialStore<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Storage key for a tenant's record.
    #[must_use]
    pub fn record_key(tenant: &TenantId) -> Vec<u8> {
        format!("{CREDENTIAL_KEY_PREFIX}{tenant}").into_bytes()
    }
}

#[async_trait]
impl<B: KeyValueBackend> CredentialStore for KeyValueCredentialStore<B> {
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    async fn get(&self, tenant: &TenantId) -> StorageResult<Option<CredentialRecord>> {
        let Some(bytes) = self.backend.get(&Self::record_key(tenant)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StorageError::serialization_with_source(
                format!("corrupt credential record for tenant {tenant}"),
                e,
            )
        })
    }

    #[tracing::instrument(skip(self, record), fields(tenant = %tenant, delete = record.is_none()))]
    async fn set(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        let key = Self::record_key(tenant);
        match record {
            Some(record) => {
                let value = serde_json::to_vec(record).map_err(|e| {
                    StorageError::serialization_with_source("failed to encode credential record", e)
                })?;
                self.backend.set(key, value).await
            },
            None => self.backend.delete(&key).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{assert_storage_error, memory::MemoryBackend};

    #[tokio::test]
    async fn test_record_roundtrip_through_backend() {
        let store = KeyValueCredentialStore::new(MemoryBackend::new());
        let tenant = TenantId::from("ak_1");
        let record = CredentialRecord::new("aa", Utc::now())
            .unwrap()
            .rotate("bb", 5, Utc::now())
            .unwrap();

        store.set(&tenant, Some(&record)).await.expect("set");

        assert_eq!(store.get(&tenant).await.expect("get"), Some(record));
        assert_eq!(store.backend().keys(), vec![b"credentials/ak_1".to_vec()]);
    }

    #[tokio::test]
    async fn test_delete_removes_key() {
        let store = KeyValueCredentialStore::new(MemoryBackend::new());
        let tenant = TenantId::from("ak_1");
        store.set(&tenant, Some(&CredentialRecord::new("aa", Utc::now()).unwrap())).await.unwrap();

        store.set(&tenant, None).await.expect("delete");

        assert!(store.get(&tenant).await.unwrap().is_none());
        assert!(store.backend().keys().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_bytes_surface_serialization_error() {
        let backend = MemoryBackend::new();
        backend.set(b"credentials/ak_1".to_vec(), b"{not json".to_vec()).await.unwrap();
        let store = KeyValueCredentialStore::new(backend);

        let result = store.get(&TenantId::from("ak_1")).await;

        assert_storage_error!(result, Serialization);
    }

    #[tokio::test]
    async fn test_record_without_active_key_is_rejected() {
        let backend = MemoryBackend::new();
        backend
            .set(
                b"credentials/ak_1".to_vec(),
                br#"{"active":"","previous":[],"last_rotated_at":"2024-01-15T10:30:00Z"}"#.to_vec(),
            )
            .await
            .unwrap();
        let store = KeyValueCredentialStore::new(backend);

        let result = store.get(&TenantId::from("ak_1")).await;

        assert_storage_error!(result, Serialization);
    }
}
