//! Counters for credential lifecycle events.
//!
//! # Examples
//!
//! ```
//! use paygate_authn::metrics::CredentialMetrics;
//!
//! let metrics = CredentialMetrics::new();
//! metrics.record_rotated();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.rotated, 1);
//! assert_eq!(snapshot.created, 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of credential metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bon::Builder)]
pub struct CredentialMetricsSnapshot {
    /// Records created (persisted or memory-only).
    #[builder(default)]
    pub created: u64,
    /// Successful rotations.
    #[builder(default)]
    pub rotated: u64,
    /// Records deleted by expiry.
    #[builder(default)]
    pub expired: u64,
    /// Records served without durable backing.
    #[builder(default)]
    pub degraded: u64,
    /// Store operations that returned an error.
    #[builder(default)]
    pub store_failures: u64,
}

/// Lock-free counters shared by every operation of a manager.
#[derive(Debug, Default)]
pub struct CredentialMetrics {
    created: AtomicU64,
    rotated: AtomicU64,
    expired: AtomicU64,
    degraded: AtomicU64,
    store_failures: AtomicU64,
}

impl CredentialMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a newly created record.
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a committed rotation.
    pub fn record_rotated(&self) {
        self.rotated.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an expiry deletion.
    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a record served from memory only.
    pub fn record_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a failed store call.
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> CredentialMetricsSnapshot {
        CredentialMetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            rotated: self.rotated.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = CredentialMetrics::new();
        metrics.record_created();
        metrics.record_created();
        metrics.record_expired();
        metrics.record_degraded();
        metrics.record_store_failure();

        assert_eq!(
            metrics.snapshot(),
            CredentialMetricsSnapshot::builder()
                .created(2)
                .expired(1)
                .degraded(1)
                .store_failures(1)
                .build()
        );
    }
}
