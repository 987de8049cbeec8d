//! In-memory key/value backend.
//!
//! [`MemoryBackend`] implements [`KeyValueBackend`] over a [`BTreeMap`]. It is
//! the reference backend for [`KeyValueCredentialStore`] in tests and local
//! development; data is lost when the process exits.
//!
//! # Example
//!
//! ```
//! use paygate_storage::{KeyValueBackend, MemoryBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"greeting".to_vec(), b"hello".to_vec()).await.unwrap();
//!     let value = backend.get(b"greeting").await.unwrap();
//!
//!     assert_eq!(value.unwrap().as_ref(), b"hello");
//! }
//! ```
//!
//! [`KeyValueCredentialStore`]: crate::KeyValueCredentialStore

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{backend::KeyValueBackend, error::StorageResult};

/// In-memory key/value backend using a [`BTreeMap`].
///
/// Cheaply cloneable; all clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
}

impl MemoryBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every key currently stored, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").field("entries", &self.data.read().len()).finish()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    #[tracing::instrument(skip_all)]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        Ok(self.data.read().get(key).cloned())
    }

    #[tracing::instrument(skip_all, fields(value_len = value.len()))]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.data.write().insert(key, Bytes::from(value));
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
