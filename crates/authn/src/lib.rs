//! # Paygate Common Authentication
//!
//! Per-tenant HMAC-SHA256 credentials for the payment gateway client.
//!
//! This crate provides:
//! - **Key generation**: OS-backed random secrets and salts ([`keygen`])
//! - **Credential lifecycle**: lazy creation, rotation with a bounded history
//!   of retired keys, and expiry ([`CredentialManager`])
//! - **Request signing**: canonical message construction and the four
//!   authentication headers ([`RequestSigner`])
//! - **Signature verification**: constant-time checks against the active and
//!   retained keys, timestamp tolerance and replay rejection
//!   ([`SignatureVerifier`])
//!
//! ## Degraded Operation
//!
//! When the credential store is unreachable on first use, the manager still
//! issues a key and keeps it in memory only. The signer reports this through
//! [`SignedRequest::durability`] so callers can decide whether to proceed.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use paygate_authn::{CredentialManager, RequestHeaders, RequestSigner, SignatureVerifier};
//! use paygate_storage::TenantId;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let manager = Arc::new(CredentialManager::in_memory());
//! let signer = RequestSigner::new(Arc::clone(&manager));
//! let verifier = SignatureVerifier::new(manager);
//!
//! let tenant = TenantId::from("ak_1");
//! let body = br#"{"amount":100}"#;
//! let signed = signer.sign(&tenant, "POST", "/v1/payments", body).await.unwrap();
//!
//! let headers = RequestHeaders::from_pairs(signed.headers()).unwrap();
//! verifier.verify_request(&headers, "POST", "/v1/payments", body, Utc::now()).await.unwrap();
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Credential and verification configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Secure key and salt generation.
pub mod keygen;
/// Per-tenant credential lifecycle.
pub mod manager;
/// Credential lifecycle counters.
pub mod metrics;
pub mod replay;
/// Canonical message and HMAC primitives.
pub mod signature;
pub mod signer;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod verifier;

// Re-export key types for convenience
pub use config::{
    CredentialConfig, DEFAULT_EXPIRY_THRESHOLD_DAYS, DEFAULT_KEY_LENGTH_BYTES,
    DEFAULT_REPLAY_CAPACITY, DEFAULT_REQUEST_TOLERANCE, DEFAULT_ROTATION_THRESHOLD_DAYS,
    DEFAULT_SALT_LENGTH, MIN_KEY_LENGTH_BYTES, RotationPolicy,
};
pub use error::{AuthError, Result};
pub use keygen::{generate_key, generate_key_with, generate_salt};
pub use manager::{ActiveKey, CredentialLookup, CredentialManager, Durability, RotationOutcome};
pub use metrics::CredentialMetricsSnapshot;
pub use replay::{InMemoryReplayDetector, ReplayDetector};
pub use signature::{canonical_message, compute_signature};
pub use signer::{
    HEADER_ACCESS_KEY, HEADER_SALT, HEADER_SIGNATURE, HEADER_TIMESTAMP, RequestSigner,
    SignedRequest,
};
pub use verifier::{RequestHeaders, SignatureVerifier};
