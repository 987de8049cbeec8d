//! Credential storage for the payment gateway client.
//!
//! This crate holds the per-tenant [`CredentialRecord`] (one active HMAC
//! secret plus a bounded history of retired ones) and the
//! [`CredentialStore`] abstraction that persists it. Lifecycle policy
//! (creation, rotation, expiry, caching) lives in `paygate-authn`; this crate
//! only stores and returns whole records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    paygate-authn                            │
//! │     CredentialManager │ RequestSigner │ SignatureVerifier   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  CredentialStore trait                      │
//! │                     (get, set)                              │
//! ├───────────────────────┬─────────────────────────────────────┤
//! │ MemoryCredentialStore │  KeyValueCredentialStore<B>         │
//! │     (default)         │  over any KeyValueBackend           │
//! └───────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use chrono::Utc;
//! use paygate_storage::{CredentialRecord, CredentialStore, MemoryCredentialStore, TenantId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryCredentialStore::new();
//!     let tenant = TenantId::from("ak_1");
//!
//!     let record = CredentialRecord::new("00ff", Utc::now())?;
//!     store.set(&tenant, Some(&record)).await?;
//!
//!     let rotated = record.rotate("11ee", 5, Utc::now())?;
//!     store.set(&tenant, Some(&rotated)).await?;
//!
//!     let stored = store.get(&tenant).await?.expect("record exists");
//!     assert_eq!(stored.active(), "11ee");
//!     assert_eq!(stored.previous().collect::<Vec<_>>(), vec!["00ff"]);
//!     Ok(())
//! }
//! ```
//!
//! # Available Stores
//!
//! | Store | Use Case | Persistence |
//! |-------|----------|-------------|
//! | [`MemoryCredentialStore`] | Default, testing | No |
//! | [`KeyValueCredentialStore`] | Any external key/value system | Backend-defined |
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Stores map their internal
//! errors to [`StorageError`]; [`StorageError::is_transient`] tells callers
//! whether serving an unpersisted record is an acceptable fallback.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with a fault-injecting store, record factories,
//!   and assertion macros, plus the [`conformance`] suite for `CredentialStore` implementations.
//!   Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod audit;
pub mod backend;
pub mod backend_enum;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod conformance;
pub mod credential;
pub mod error;
pub mod kv_store;
pub mod memory;
pub mod store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use audit::{AuditAction, AuditEvent, AuditLogger, AuditResult, NoopAuditLogger, TracingAuditLogger};
pub use backend::KeyValueBackend;
pub use backend_enum::CredentialStoreBackend;
pub use credential::{CredentialRecord, DEFAULT_PREVIOUS_CAPACITY, RecordError};
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use kv_store::{CREDENTIAL_KEY_PREFIX, KeyValueCredentialStore};
pub use memory::MemoryBackend;
pub use store::{CredentialStore, MemoryCredentialStore};
pub use types::TenantId;
pub use zeroize::Zeroizing;
