//! Byte-oriented key/value backend trait.
//!
//! External credential stores (databases, secret managers, replicated KV
//! services) rarely speak [`CredentialRecord`](crate::CredentialRecord)
//! natively. [`KeyValueBackend`] is the minimal interface such a system must
//! offer so that [`KeyValueCredentialStore`](crate::KeyValueCredentialStore)
//! can persist records on top of it:
//!
//! - **Keys and values are bytes**: no assumptions about serialization format
//! - **Async by default**: all operations are async for non-blocking I/O
//! - **Whole-value writes**: a `set` either replaces the value or fails
//!
//! # Implementing a Backend
//!
//! 1. Implement [`KeyValueBackend`]
//! 2. Map backend-specific errors to [`StorageError`](crate::StorageError),
//!    using `Connection`/`Timeout` for failures that may clear on their own
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// Abstract key/value storage.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Reads the value stored at `key`, if any.
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Writes `value` at `key`, replacing any previous value.
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Verifies that the backend is reachable.
    async fn health_check(&self) -> StorageResult<()>;
}
