//! Per-tenant credential record.
//!
//! A [`CredentialRecord`] holds the symmetric secret a tenant currently signs
//! with plus a bounded history of retired secrets that are still accepted
//! during verification.
//!
//! # Invariants
//!
//! - `active` is never empty. A record without an active key cannot be
//!   constructed or deserialized.
//! - `previous` is ordered newest to oldest. Rotation inserts at the head and
//!   evicts from the tail once the retention capacity is reached.
//! - `last_rotated_at` never moves backwards across rotations.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use paygate_storage::CredentialRecord;
//!
//! let record = CredentialRecord::new("aa11", Utc::now())?;
//! let rotated = record.rotate("bb22", 5, Utc::now())?;
//!
//! assert_eq!(rotated.active(), "bb22");
//! assert_eq!(rotated.previous().collect::<Vec<_>>(), vec!["aa11"]);
//! # Ok::<(), paygate_storage::RecordError>(())
//! ```

use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Default number of retired keys retained for verification.
pub const DEFAULT_PREVIOUS_CAPACITY: usize = 5;

/// Reasons a credential record cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// The active key was empty.
    #[error("credential record requires a non-empty active key")]
    EmptyActiveKey,

    /// A retired key was empty.
    #[error("retired key at position {index} is empty")]
    EmptyPreviousKey {
        /// Position in the newest-first history.
        index: usize,
    },
}

/// Credential state for a single tenant.
///
/// Key material is wrapped in [`Zeroizing`] so it is scrubbed from memory on
/// drop, and the [`Debug`] implementation never prints it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr")]
pub struct CredentialRecord {
    active: Zeroizing<String>,
    previous: VecDeque<Zeroizing<String>>,
    last_rotated_at: DateTime<Utc>,
}

/// Wire shape used to validate records on deserialization.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordRepr {
    active: Zeroizing<String>,
    #[serde(default)]
    previous: VecDeque<Zeroizing<String>>,
    last_rotated_at: DateTime<Utc>,
}

impl TryFrom<RecordRepr> for CredentialRecord {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        Self::validated(repr.active, repr.previous, repr.last_rotated_at)
    }
}

#[bon::bon]
impl CredentialRecord {
    /// Creates a fresh record with an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyActiveKey`] if `active` is empty.
    pub fn new(
        active: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        Self::validated(Zeroizing::new(active.into()), VecDeque::new(), created_at)
    }

    /// Rebuilds a record from stored parts, validating every invariant.
    ///
    /// `previous` must already be ordered newest to oldest.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the active key or any retired key is empty.
    #[builder(finish_fn = build)]
    pub fn restore(
        #[builder(into)] active: String,
        #[builder(default, with = |iter: impl IntoIterator<Item = impl Into<String>>| {
            iter.into_iter().map(Into::into).collect()
        })]
        previous: Vec<String>,
        #[builder(default = Utc::now())] last_rotated_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        Self::validated(
            Zeroizing::new(active),
            previous.into_iter().map(Zeroizing::new).collect(),
            last_rotated_at,
        )
    }

    fn validated(
        active: Zeroizing<String>,
        previous: VecDeque<Zeroizing<String>>,
        last_rotated_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if active.is_empty() {
            return Err(RecordError::EmptyActiveKey);
        }
        if let Some(index) = previous.iter().position(|key| key.is_empty()) {
            return Err(RecordError::EmptyPreviousKey { index });
        }
        Ok(Self { active, previous, last_rotated_at })
    }

    /// Returns a new record with `new_active` as the signing key.
    ///
    /// The current active key moves to the head of the history, which is then
    /// truncated to `capacity` entries (oldest evicted first). The rotation
    /// timestamp is `max(now, last_rotated_at)` so it never regresses.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyActiveKey`] if `new_active` is empty.
    pub fn rotate(
        &self,
        new_active: impl Into<String>,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let new_active = Zeroizing::new(new_active.into());
        if new_active.is_empty() {
            return Err(RecordError::EmptyActiveKey);
        }

        let mut previous = self.previous.clone();
        previous.push_front(self.active.clone());
        previous.truncate(capacity);

        Ok(Self { active: new_active, previous, last_rotated_at: now.max(self.last_rotated_at) })
    }

    /// The current signing secret (hex).
    #[must_use]
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Retired secrets, newest first.
    pub fn previous(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.previous.iter().map(|key| key.as_str())
    }

    /// Number of retired secrets currently retained.
    #[must_use]
    pub fn previous_len(&self) -> usize {
        self.previous.len()
    }

    /// Every accepted secret in verification order: active, then retired
    /// keys newest to oldest.
    pub fn verification_keys(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.active.as_str()).chain(self.previous())
    }

    /// When the record was created or last rotated.
    #[must_use]
    pub fn last_rotated_at(&self) -> DateTime<Utc> {
        self.last_rotated_at
    }

    /// Time elapsed since the last rotation, clamped at zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_rotated_at).max(Duration::zero())
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("active", &"<redacted>")
            .field("previous", &format_args!("<{} redacted>", self.previous.len()))
            .field("last_rotated_at", &self.last_rotated_at)
            .finish()
    }
}
