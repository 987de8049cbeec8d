//! Shared test utilities for authentication testing.
//!
//! Feature-gated behind `testutil` so none of this leaks into production
//! builds. Enable it from an integration test's dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! paygate-authn = { path = "../authn", features = ["testutil"] }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use paygate_storage::{AuditAction, AuditEvent, AuditLogger, CredentialStore, TenantId};

use crate::{
    config::CredentialConfig,
    error::Result,
    manager::CredentialManager,
    signature::{canonical_message, compute_signature},
    verifier::RequestHeaders,
};

/// Audit logger that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditLogger {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Just the actions of the recorded events, oldest first.
    #[must_use]
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events.lock().iter().map(|event| event.action).collect()
    }
}

#[async_trait]
impl AuditLogger for RecordingAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A manager with default configuration over `store`, recording its audit
/// trail into the returned logger.
pub fn recorded_manager(
    store: Arc<dyn CredentialStore>,
) -> (Arc<CredentialManager>, Arc<RecordingAuditLogger>) {
    let logger = Arc::new(RecordingAuditLogger::new());
    let manager = CredentialManager::new(store, CredentialConfig::default())
        .with_audit_logger(logger.clone());
    (Arc::new(manager), logger)
}

/// Headers for a request signed with `secret` at a fixed `timestamp`.
///
/// Bypasses the manager entirely, so tests can present signatures made with
/// keys the verifier may or may not still accept.
///
/// # Errors
///
/// Returns [`AuthError::InvalidKeyMaterial`](crate::AuthError::InvalidKeyMaterial)
/// if `secret` cannot key an HMAC.
pub fn signed_headers(
    secret: &str,
    tenant: &TenantId,
    method: &str,
    path: &str,
    body: &[u8],
    salt: &str,
    timestamp: i64,
) -> Result<RequestHeaders> {
    let message = canonical_message(method, path, salt, timestamp, tenant.as_str(), body);
    Ok(RequestHeaders {
        access_key_id: tenant.clone(),
        salt: salt.to_owned(),
        timestamp,
        signature: compute_signature(secret, &message)?,
    })
}
