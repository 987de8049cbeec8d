//! Outbound request signing.
//!
//! [`RequestSigner`] resolves the tenant's active key through the
//! [`CredentialManager`], builds the canonical message and attaches the
//! resulting signature as four headers: `access_key`, `salt`, `timestamp`
//! and `signature`.
//!
//! Key resolution happens before the caller performs any network I/O; the
//! signer itself has no side effects beyond what the manager does.

use std::sync::Arc;

use chrono::Utc;
use paygate_storage::TenantId;

use crate::{
    config::RotationPolicy,
    error::Result,
    keygen,
    manager::{CredentialManager, Durability},
    signature::{canonical_message, compute_signature},
};

/// Header carrying the tenant's access key identifier.
pub const HEADER_ACCESS_KEY: &str = "access_key";
/// Header carrying the per-request salt.
pub const HEADER_SALT: &str = "salt";
/// Header carrying the request timestamp (seconds since the Unix epoch).
pub const HEADER_TIMESTAMP: &str = "timestamp";
/// Header carrying the lowercase hex signature.
pub const HEADER_SIGNATURE: &str = "signature";

/// Authentication material for one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Tenant the request was signed for.
    pub access_key_id: TenantId,
    /// Per-request salt.
    pub salt: String,
    /// Signing time in seconds.
    pub timestamp: i64,
    /// Lowercase hex HMAC-SHA256.
    pub signature: String,
    /// Whether the signing key is durably stored. A
    /// [`Durability::MemoryOnly`] key may be unknown to the gateway.
    pub durability: Durability,
}

impl SignedRequest {
    /// The four authentication headers as `(name, value)` pairs.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_ACCESS_KEY, self.access_key_id.to_string()),
            (HEADER_SALT, self.salt.clone()),
            (HEADER_TIMESTAMP, self.timestamp.to_string()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}

/// Signs outbound requests with each tenant's active key.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use paygate_authn::{CredentialManager, RequestSigner};
/// use paygate_storage::TenantId;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let signer = RequestSigner::new(Arc::new(CredentialManager::in_memory()));
/// let signed = signer
///     .sign(&TenantId::from("ak_1"), "POST", "/v1/payments", br#"{"amount":100}"#)
///     .await
///     .unwrap();
///
/// assert_eq!(signed.salt.len(), 8);
/// assert_eq!(signed.signature.len(), 64);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RequestSigner {
    manager: Arc<CredentialManager>,
    policy: Option<RotationPolicy>,
}

impl RequestSigner {
    /// Creates a signer that never rotates on its own.
    #[must_use]
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        Self { manager, policy: None }
    }

    /// Runs [`CredentialManager::check_and_rotate_if_due`] with `policy`
    /// before every signature.
    #[must_use]
    pub fn with_rotation_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// The manager keys are resolved through.
    #[must_use]
    pub fn manager(&self) -> &Arc<CredentialManager> {
        &self.manager
    }

    /// Signs a request with a fresh salt and the current time.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyGeneration`](crate::AuthError::KeyGeneration) if
    ///   salt or key generation fails
    /// - [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) if the key
    ///   cannot be resolved, or a due rotation cannot be persisted
    pub async fn sign(
        &self,
        tenant: &TenantId,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<SignedRequest> {
        let salt = keygen::generate_salt(self.manager.config().salt_length())?;
        let timestamp = Utc::now().timestamp();
        self.sign_with(tenant, method, path, body, timestamp, &salt).await
    }

    /// Signs a request with an explicit timestamp and salt.
    ///
    /// # Errors
    ///
    /// Same as [`sign`](Self::sign).
    #[tracing::instrument(skip(self, body), fields(tenant = %tenant, body_len = body.len()))]
    pub async fn sign_with(
        &self,
        tenant: &TenantId,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: i64,
        salt: &str,
    ) -> Result<SignedRequest> {
        if let Some(policy) = self.policy {
            let outcome = self.manager.check_and_rotate_if_due(tenant, policy).await?;
            tracing::debug!(?outcome, "rotation check before signing");
        }

        let key = self.manager.get_active_key(tenant).await?;
        let message = canonical_message(method, path, salt, timestamp, tenant.as_str(), body);
        let signature = compute_signature(key.secret(), &message)?;

        Ok(SignedRequest {
            access_key_id: tenant.clone(),
            salt: salt.to_owned(),
            timestamp,
            signature,
            durability: key.durability().clone(),
        })
    }
}
