//! Signature verification with a grace window for rotated keys.
//!
//! [`SignatureVerifier::verify`] accepts a signature made with the tenant's
//! active key or with any retained previous key, so requests signed just
//! before a rotation keep verifying. The grace window is bounded by how many
//! retired keys the record keeps, not by time.
//!
//! # Verification Order
//!
//! ```text
//! hex-decode signature   → malformed?  → false
//! peek(tenant)           → no record?  → false (never creates)
//! HMAC(active)           → match?      → true
//! HMAC(previous[0..])    → match?      → true   (newest first)
//!                                      → false
//! ```
//!
//! Every comparison is constant-time ([`Mac::verify_slice`]).
//!
//! [`Mac::verify_slice`]: hmac::Mac::verify_slice

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use paygate_storage::TenantId;
use tracing::debug;

use crate::{
    error::{AuthError, Result},
    manager::CredentialManager,
    replay::{InMemoryReplayDetector, ReplayDetector},
    signature::{canonical_message, signature_matches},
    signer::{HEADER_ACCESS_KEY, HEADER_SALT, HEADER_SIGNATURE, HEADER_TIMESTAMP, SignedRequest},
};

/// Authentication headers received with an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Claimed tenant.
    pub access_key_id: TenantId,
    /// Per-request salt.
    pub salt: String,
    /// Claimed signing time in seconds.
    pub timestamp: i64,
    /// Hex signature as presented.
    pub signature: String,
}

impl RequestHeaders {
    /// Collects the four authentication headers from `(name, value)` pairs.
    ///
    /// Header names match case-insensitively; unrelated headers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedHeaders`] if a header is missing or the
    /// timestamp is not an integer.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (mut access_key, mut salt, mut timestamp, mut signature) = (None, None, None, None);
        for (name, value) in pairs {
            let name = name.as_ref();
            let value = value.as_ref().to_owned();
            if name.eq_ignore_ascii_case(HEADER_ACCESS_KEY) {
                access_key = Some(value);
            } else if name.eq_ignore_ascii_case(HEADER_SALT) {
                salt = Some(value);
            } else if name.eq_ignore_ascii_case(HEADER_TIMESTAMP) {
                timestamp = Some(value);
            } else if name.eq_ignore_ascii_case(HEADER_SIGNATURE) {
                signature = Some(value);
            }
        }

        let missing = |header: &str| AuthError::MalformedHeaders(format!("missing {header}"));
        let timestamp = timestamp.ok_or_else(|| missing(HEADER_TIMESTAMP))?;
        let timestamp = timestamp.trim().parse::<i64>().map_err(|e| {
            AuthError::MalformedHeaders(format!("{HEADER_TIMESTAMP} {timestamp:?}: {e}"))
        })?;

        Ok(Self {
            access_key_id: TenantId::from(access_key.ok_or_else(|| missing(HEADER_ACCESS_KEY))?),
            salt: salt.ok_or_else(|| missing(HEADER_SALT))?,
            timestamp,
            signature: signature.ok_or_else(|| missing(HEADER_SIGNATURE))?,
        })
    }
}

impl From<&SignedRequest> for RequestHeaders {
    fn from(signed: &SignedRequest) -> Self {
        Self {
            access_key_id: signed.access_key_id.clone(),
            salt: signed.salt.clone(),
            timestamp: signed.timestamp,
            signature: signed.signature.clone(),
        }
    }
}

/// Verifies signatures against a tenant's active and retained keys.
pub struct SignatureVerifier {
    manager: Arc<CredentialManager>,
    replay: Arc<dyn ReplayDetector>,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Creates a verifier using the manager's configured tolerance and an
    /// [`InMemoryReplayDetector`] of the configured capacity.
    #[must_use]
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        let tolerance = manager.config().request_tolerance();
        let replay = Arc::new(InMemoryReplayDetector::new(manager.config().replay_capacity()));
        Self { manager, replay, tolerance }
    }

    /// Replaces the replay detector.
    #[must_use]
    pub fn with_replay_detector(mut self, replay: Arc<dyn ReplayDetector>) -> Self {
        self.replay = replay;
        self
    }

    /// Overrides the accepted timestamp skew.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Checks `provided_hex` against the HMAC of `signed_data` under each of
    /// the tenant's accepted keys.
    ///
    /// Returns `Ok(false)` for a mismatch, a malformed or wrong-length
    /// signature, or a tenant with no record. Verification never creates
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyStorage`] only when the tenant's keys are not
    /// cached and the store cannot be read.
    #[tracing::instrument(skip(self, signed_data, provided_hex), fields(tenant = %tenant))]
    pub async fn verify(
        &self,
        tenant: &TenantId,
        signed_data: &[u8],
        provided_hex: &str,
    ) -> Result<bool> {
        let Ok(provided) = hex::decode(provided_hex) else {
            debug!("signature is not valid hex");
            return Ok(false);
        };
        let Some(record) = self.manager.peek(tenant).await? else {
            debug!("no credentials for tenant");
            return Ok(false);
        };

        let matched = record
            .verification_keys()
            .position(|key| signature_matches(key, signed_data, &provided));
        match matched {
            Some(0) => debug!(key = "active", "signature verified"),
            Some(index) => debug!(key = "previous", position = index - 1, "signature verified"),
            None => debug!("signature mismatch"),
        }
        Ok(matched.is_some())
    }

    /// Authenticates an inbound request.
    ///
    /// Rebuilds the canonical message from the request parts and `headers`,
    /// then checks, in order:
    ///
    /// 1. the timestamp is within the tolerance of `now`
    /// 2. the signature verifies under an accepted key
    /// 3. the salt/timestamp pair has not been accepted before
    ///
    /// The replay check runs last so unauthenticated traffic cannot fill the
    /// replay cache.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StaleRequest`] if the timestamp is outside the tolerance
    /// - [`AuthError::InvalidSignature`] if no accepted key matches
    /// - [`AuthError::ReplayedRequest`] if the request was already accepted
    /// - [`AuthError::KeyStorage`] if the tenant's keys cannot be resolved
    #[tracing::instrument(
        skip(self, headers, body),
        fields(tenant = %headers.access_key_id, timestamp = headers.timestamp)
    )]
    pub async fn verify_request(
        &self,
        headers: &RequestHeaders,
        method: &str,
        path: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let skew_secs = now.timestamp().saturating_sub(headers.timestamp).saturating_abs();
        let tolerance_secs = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if skew_secs > tolerance_secs {
            return Err(AuthError::StaleRequest { timestamp: headers.timestamp, skew_secs });
        }

        let message = canonical_message(
            method,
            path,
            &headers.salt,
            headers.timestamp,
            headers.access_key_id.as_str(),
            body,
        );
        if !self.verify(&headers.access_key_id, &message, &headers.signature).await? {
            return Err(AuthError::InvalidSignature);
        }

        self.replay
            .check_and_mark(
                &headers.access_key_id,
                &headers.salt,
                headers.timestamp,
                self.tolerance.saturating_mul(2),
            )
            .await
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("manager", &self.manager)
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}
