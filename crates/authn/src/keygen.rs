//! Secret and salt generation.
//!
//! All randomness comes from the operating system's CSPRNG
//! ([`OsRng`]). If it fails the caller gets
//! [`AuthError::KeyGeneration`]; there is no fallback to a weaker source.

use rand_core::{CryptoRng, OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Generates a secret of `length_bytes` random bytes, hex-encoded
/// (lowercase, `2 * length_bytes` characters).
///
/// # Errors
///
/// Returns [`AuthError::KeyGeneration`] if `length_bytes` is zero or the OS
/// random source fails.
///
/// # Example
///
/// ```
/// let key = paygate_authn::generate_key(32)?;
/// assert_eq!(key.len(), 64);
/// # Ok::<(), paygate_authn::AuthError>(())
/// ```
pub fn generate_key(length_bytes: usize) -> Result<Zeroizing<String>> {
    generate_key_with(&mut OsRng, length_bytes)
}

/// [`generate_key`] over a caller-supplied cryptographic RNG.
///
/// # Errors
///
/// Returns [`AuthError::KeyGeneration`] if `length_bytes` is zero or `rng`
/// fails.
pub fn generate_key_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    length_bytes: usize,
) -> Result<Zeroizing<String>> {
    if length_bytes == 0 {
        return Err(AuthError::key_generation("key length must be non-zero"));
    }
    let mut bytes = Zeroizing::new(vec![0u8; length_bytes]);
    rng.try_fill_bytes(&mut bytes).map_err(|e| AuthError::key_generation(e.to_string()))?;
    Ok(Zeroizing::new(hex::encode(&*bytes)))
}

/// Generates a random lowercase hex salt of exactly `length` characters.
///
/// # Errors
///
/// Returns [`AuthError::KeyGeneration`] if the OS random source fails.
pub fn generate_salt(length: usize) -> Result<String> {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| AuthError::key_generation(e.to_string()))?;
    let mut salt = hex::encode(bytes);
    salt.truncate(length);
    Ok(salt)
}
