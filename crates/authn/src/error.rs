//! Authentication error types.
//!
//! This module defines errors that can occur while managing tenant
//! credentials, signing outbound requests and verifying inbound ones.
//!
//! A signature that simply does not match is *not* an error:
//! [`SignatureVerifier::verify`](crate::SignatureVerifier::verify) reports it
//! as `Ok(false)`. Errors are reserved for failures where no answer could be
//! produced, or for request-level rejections in
//! [`verify_request`](crate::SignatureVerifier::verify_request).

use paygate_storage::{ConfigError, RecordError, StorageError};
use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The operating system's secure random source failed.
    ///
    /// Fatal: no weaker source is ever substituted.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Storage backend error while reading or writing credentials.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Key storage error: {0}")]
    KeyStorage(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(
        /// The validation failure.
        #[source]
        ConfigError,
    ),

    /// A caller-supplied key would produce an invalid record.
    #[error("Invalid credential: {0}")]
    InvalidCredential(
        /// The record invariant that was violated.
        #[source]
        RecordError,
    ),

    /// Key material could not be used as an HMAC key.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A required authentication header is missing or unparseable.
    #[error("Malformed request headers: {0}")]
    MalformedHeaders(String),

    /// Request timestamp lies outside the accepted window.
    #[error("Stale request: timestamp {timestamp} is {skew_secs}s from now")]
    StaleRequest {
        /// Timestamp carried by the request.
        timestamp: i64,
        /// Absolute distance from the verifier's clock, in seconds.
        skew_secs: i64,
    },

    /// The salt/timestamp pair was already presented.
    #[error("Replayed request: salt {salt} at {timestamp}")]
    ReplayedRequest {
        /// Salt carried by the request.
        salt: String,
        /// Timestamp carried by the request.
        timestamp: i64,
    },

    /// No active or retained key produced the presented signature.
    #[error("Invalid signature")]
    InvalidSignature,
}

impl AuthError {
    /// Creates a [`KeyGeneration`](Self::KeyGeneration) error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration(message.into())
    }

    /// Creates a [`ReplayedRequest`](Self::ReplayedRequest) error.
    #[must_use]
    pub fn replayed_request(salt: impl Into<String>, timestamp: i64) -> Self {
        Self::ReplayedRequest { salt: salt.into(), timestamp }
    }

    /// Returns `true` if the error came from the credential store.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::KeyStorage(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::KeyStorage(err)
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::InvalidConfig(err)
    }
}

impl From<RecordError> for AuthError {
    fn from(err: RecordError) -> Self {
        AuthError::InvalidCredential(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
