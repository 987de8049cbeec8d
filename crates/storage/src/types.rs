//! Common identifier types used across credential storage.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Tenant identifier: the access-key id a gateway client signs requests as.
///
/// This is the sole key into both the in-memory credential cache and every
/// [`CredentialStore`](crate::CredentialStore). It is sent verbatim in the
/// `access_key` header and concatenated into the canonical signing string.
///
/// Cloning is cheap; the id is shared behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use paygate_storage::TenantId;
///
/// let tenant = TenantId::from("ak_1");
/// assert_eq!(tenant.as_str(), "ak_1");
/// assert_eq!(tenant.to_string(), "ak_1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Arc<str>);

impl TenantId {
    /// Creates a tenant id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
