//! Canonical request message and HMAC-SHA256 primitives.
//!
//! The canonical message is the byte-for-byte concatenation
//!
//! ```text
//! METHOD + path + salt + timestamp + access_key_id + body
//! ```
//!
//! with the method upper-cased, the timestamp in decimal seconds and the body
//! as raw bytes (empty for bodyless requests). The secret is only ever the
//! HMAC key; it never appears in the message.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Builds the canonical message signed for a request.
///
/// # Example
///
/// ```
/// use paygate_authn::canonical_message;
///
/// let message = canonical_message("post", "/v1/payments", "abcd1234", 1_700_000_000, "ak_1", b"{}");
/// assert_eq!(message, b"POST/v1/paymentsabcd12341700000000ak_1{}");
/// ```
#[must_use]
pub fn canonical_message(
    method: &str,
    path: &str,
    salt: &str,
    timestamp: i64,
    access_key_id: &str,
    body: &[u8],
) -> Vec<u8> {
    let timestamp = timestamp.to_string();
    let mut message = Vec::with_capacity(
        method.len() + path.len() + salt.len() + timestamp.len() + access_key_id.len() + body.len(),
    );
    message.extend_from_slice(method.to_ascii_uppercase().as_bytes());
    message.extend_from_slice(path.as_bytes());
    message.extend_from_slice(salt.as_bytes());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(access_key_id.as_bytes());
    message.extend_from_slice(body);
    message
}

/// Lowercase hex HMAC-SHA256 of `message` keyed with `secret`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidKeyMaterial`] if `secret` is rejected as an
/// HMAC key.
pub fn compute_signature(secret: &str, message: &[u8]) -> Result<String> {
    let mut mac = keyed(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check that `provided` is the HMAC of `message` under
/// `secret`. Length mismatches are a plain `false`.
pub(crate) fn signature_matches(secret: &str, message: &[u8], provided: &[u8]) -> bool {
    let Ok(mut mac) = keyed(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(provided).is_ok()
}

fn keyed(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::InvalidKeyMaterial(e.to_string()))
}
