//! Inbound request replay prevention.
//!
//! Every signed request carries a random salt and a timestamp. Once a request
//! has been accepted, its `(access key, salt, timestamp)` triple is
//! remembered until the timestamp falls out of the accepted window; a second
//! presentation within that window is rejected.
//!
//! # Usage
//!
//! ```no_run
//! use paygate_authn::replay::InMemoryReplayDetector;
//!
//! // Track at most 10_000 recently accepted requests
//! let detector = InMemoryReplayDetector::new(10_000);
//! ```
//!
//! # Design
//!
//! - **Per-entry expiry**: Each entry lives only as long as its request could still pass the
//!   timestamp check, bounding memory usage automatically.
//! - **Capacity-bounded**: The in-memory implementation uses LRU eviction as a safety net beyond
//!   per-entry TTL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, policy::EvictionPolicy};
use paygate_storage::TenantId;

use crate::error::AuthError;

/// Trait for request replay detection.
///
/// Implementations track accepted requests and reject duplicates, cleaning
/// up expired entries on their own.
#[async_trait]
pub trait ReplayDetector: Send + Sync {
    /// Checks whether the request was seen before and marks it as seen.
    ///
    /// # Arguments
    ///
    /// * `tenant` - Access key the request was signed for
    /// * `salt` - Per-request salt
    /// * `timestamp` - Request timestamp in seconds
    /// * `expires_in` - How long the entry must be remembered
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ReplayedRequest`] if the request was already
    /// recorded.
    async fn check_and_mark(
        &self,
        tenant: &TenantId,
        salt: &str,
        timestamp: i64,
        expires_in: Duration,
    ) -> Result<(), AuthError>;
}

/// Identity of an accepted request: access key, salt and timestamp.
type RequestKey = (TenantId, String, i64);

/// Per-entry expiry policy that stores the absolute deadline as the value.
struct RequestExpiry;

impl moka::Expiry<RequestKey, Instant> for RequestExpiry {
    fn expire_after_create(
        &self,
        _key: &RequestKey,
        value: &Instant,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.saturating_duration_since(created_at))
    }
}

/// In-memory replay detector backed by a [`moka::future::Cache`].
///
/// # Thread Safety
///
/// `InMemoryReplayDetector` is `Send + Sync`. The check and the mark happen
/// in a single atomic cache operation, so two concurrent presentations of
/// the same request cannot both be accepted.
pub struct InMemoryReplayDetector {
    /// Cache mapping request identity to its expiration instant.
    seen: Cache<RequestKey, Instant>,
}

impl InMemoryReplayDetector {
    /// Creates a detector tracking at most `max_capacity` requests.
    pub fn new(max_capacity: u64) -> Self {
        let seen = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(RequestExpiry)
            .build();
        Self { seen }
    }
}

impl std::fmt::Debug for InMemoryReplayDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReplayDetector")
            .field("entries", &self.seen.entry_count())
            .finish()
    }
}

#[async_trait]
impl ReplayDetector for InMemoryReplayDetector {
    async fn check_and_mark(
        &self,
        tenant: &TenantId,
        salt: &str,
        timestamp: i64,
        expires_in: Duration,
    ) -> Result<(), AuthError> {
        let expiration = Instant::now() + expires_in;
        let entry = self
            .seen
            .entry((tenant.clone(), salt.to_owned(), timestamp))
            .or_insert(expiration)
            .await;

        if entry.is_fresh() {
            Ok(())
        } else {
            Err(AuthError::replayed_request(salt, timestamp))
        }
    }
}
