//! Credential lifecycle configuration.
//!
//! [`CredentialConfig`] is consumed once, when a
//! [`CredentialManager`](crate::CredentialManager) is constructed. It can be
//! built in code with a validated builder or deserialized from any serde
//! format; both paths run the same checks.
//!
//! # Example
//!
//! ```
//! use paygate_authn::CredentialConfig;
//!
//! let config = CredentialConfig::builder()
//!     .rotation_threshold_days(30)
//!     .expiry_threshold_days(120)
//!     .build()?;
//!
//! assert_eq!(config.key_length_bytes(), 32);
//! assert_eq!(config.rotation_policy().rotation_days(), 30);
//! # Ok::<(), paygate_storage::ConfigError>(())
//! ```

use std::time::Duration;

use paygate_storage::{ConfigError, DEFAULT_PREVIOUS_CAPACITY};
use serde::Deserialize;

/// Default secret length in bytes (64 hex characters).
pub const DEFAULT_KEY_LENGTH_BYTES: usize = 32;

/// Shortest secret accepted, in bytes.
pub const MIN_KEY_LENGTH_BYTES: usize = 16;

/// Default age, in days, after which the active key is rotated.
pub const DEFAULT_ROTATION_THRESHOLD_DAYS: u32 = 90;

/// Default age, in days, after which a record is deleted outright.
pub const DEFAULT_EXPIRY_THRESHOLD_DAYS: u32 = 365;

/// Default salt length in hex characters.
pub const DEFAULT_SALT_LENGTH: usize = 8;

/// Default accepted clock skew for inbound request timestamps.
pub const DEFAULT_REQUEST_TOLERANCE: Duration = Duration::from_secs(300);

/// Default number of salt/timestamp pairs tracked for replay detection.
pub const DEFAULT_REPLAY_CAPACITY: u64 = 100_000;

/// Age thresholds driving rotation and expiry.
///
/// Both thresholds are always explicit. `expiry_days` must be strictly
/// greater than `rotation_days`, otherwise a record could be deleted before
/// it was ever due for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    rotation_days: u32,
    expiry_days: u32,
}

impl RotationPolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOrdering`] if `expiry_days <= rotation_days`.
    pub fn new(rotation_days: u32, expiry_days: u32) -> Result<Self, ConfigError> {
        if expiry_days <= rotation_days {
            return Err(ConfigError::InvalidOrdering {
                greater: "expiry_threshold_days",
                greater_value: expiry_days.to_string(),
                lesser: "rotation_threshold_days",
                lesser_value: rotation_days.to_string(),
            });
        }
        Ok(Self { rotation_days, expiry_days })
    }

    /// Age at which the active key is rotated.
    #[must_use]
    pub fn rotation_days(&self) -> u32 {
        self.rotation_days
    }

    /// Age at which the record is deleted.
    #[must_use]
    pub fn expiry_days(&self) -> u32 {
        self.expiry_days
    }

    pub(crate) fn rotation_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.rotation_days))
    }

    pub(crate) fn expiry_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            rotation_days: DEFAULT_ROTATION_THRESHOLD_DAYS,
            expiry_days: DEFAULT_EXPIRY_THRESHOLD_DAYS,
        }
    }
}

/// Configuration for credential generation, retention and request checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CredentialConfigRepr")]
pub struct CredentialConfig {
    key_length_bytes: usize,
    policy: RotationPolicy,
    previous_capacity: usize,
    salt_length: usize,
    request_tolerance: Duration,
    replay_capacity: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            key_length_bytes: DEFAULT_KEY_LENGTH_BYTES,
            policy: RotationPolicy::default(),
            previous_capacity: DEFAULT_PREVIOUS_CAPACITY,
            salt_length: DEFAULT_SALT_LENGTH,
            request_tolerance: DEFAULT_REQUEST_TOLERANCE,
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

#[bon::bon]
impl CredentialConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `key_length_bytes` is below [`MIN_KEY_LENGTH_BYTES`]
    /// - `expiry_threshold_days` is not greater than `rotation_threshold_days`
    /// - `salt_length`, `request_tolerance` or `replay_capacity` is zero
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_KEY_LENGTH_BYTES)] key_length_bytes: usize,
        #[builder(default = DEFAULT_ROTATION_THRESHOLD_DAYS)] rotation_threshold_days: u32,
        #[builder(default = DEFAULT_EXPIRY_THRESHOLD_DAYS)] expiry_threshold_days: u32,
        #[builder(default = DEFAULT_PREVIOUS_CAPACITY)] previous_capacity: usize,
        #[builder(default = DEFAULT_SALT_LENGTH)] salt_length: usize,
        #[builder(default = DEFAULT_REQUEST_TOLERANCE)] request_tolerance: Duration,
        #[builder(default = DEFAULT_REPLAY_CAPACITY)] replay_capacity: u64,
    ) -> Result<Self, ConfigError> {
        if key_length_bytes < MIN_KEY_LENGTH_BYTES {
            return Err(ConfigError::BelowMinimum {
                field: "key_length_bytes",
                min: MIN_KEY_LENGTH_BYTES.to_string(),
                value: key_length_bytes.to_string(),
            });
        }
        let policy = RotationPolicy::new(rotation_threshold_days, expiry_threshold_days)?;
        if salt_length == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "salt_length",
                min: "1".into(),
                value: "0".into(),
            });
        }
        if request_tolerance.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "request_tolerance",
                min: "1s".into(),
                value: "0s".into(),
            });
        }
        if replay_capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "replay_capacity",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(Self {
            key_length_bytes,
            policy,
            previous_capacity,
            salt_length,
            request_tolerance,
            replay_capacity,
        })
    }

    /// Length of generated secrets, in bytes.
    #[must_use]
    pub fn key_length_bytes(&self) -> usize {
        self.key_length_bytes
    }

    /// Rotation and expiry thresholds.
    #[must_use]
    pub fn rotation_policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Number of retired keys kept for verification.
    #[must_use]
    pub fn previous_capacity(&self) -> usize {
        self.previous_capacity
    }

    /// Salt length in hex characters.
    #[must_use]
    pub fn salt_length(&self) -> usize {
        self.salt_length
    }

    /// Maximum accepted distance between a request timestamp and now.
    #[must_use]
    pub fn request_tolerance(&self) -> Duration {
        self.request_tolerance
    }

    /// Capacity of the default replay detector.
    #[must_use]
    pub fn replay_capacity(&self) -> u64 {
        self.replay_capacity
    }
}

/// Serialized form; every field is optional and falls back to its default.
#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct CredentialConfigRepr {
    key_length_bytes: usize,
    rotation_threshold_days: u32,
    expiry_threshold_days: u32,
    previous_capacity: usize,
    salt_length: usize,
    request_tolerance_secs: u64,
    replay_capacity: u64,
}

impl Default for CredentialConfigRepr {
    fn default() -> Self {
        Self {
            key_length_bytes: DEFAULT_KEY_LENGTH_BYTES,
            rotation_threshold_days: DEFAULT_ROTATION_THRESHOLD_DAYS,
            expiry_threshold_days: DEFAULT_EXPIRY_THRESHOLD_DAYS,
            previous_capacity: DEFAULT_PREVIOUS_CAPACITY,
            salt_length: DEFAULT_SALT_LENGTH,
            request_tolerance_secs: DEFAULT_REQUEST_TOLERANCE.as_secs(),
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

impl TryFrom<CredentialConfigRepr> for CredentialConfig {
    type Error = ConfigError;

    fn try_from(repr: CredentialConfigRepr) -> Result<Self, Self::Error> {
        CredentialConfig::builder()
            .key_length_bytes(repr.key_length_bytes)
            .rotation_threshold_days(repr.rotation_threshold_days)
            .expiry_threshold_days(repr.expiry_threshold_days)
            .previous_capacity(repr.previous_capacity)
            .salt_length(repr.salt_length)
            .request_tolerance(Duration::from_secs(repr.request_tolerance_secs))
            .replay_capacity(repr.replay_capacity)
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = CredentialConfig::builder().build().expect("defaults are valid");
        assert_eq!(config, CredentialConfig::default());
        assert_eq!(config.key_length_bytes(), 32);
        assert_eq!(config.rotation_policy(), RotationPolicy::new(90, 365).unwrap());
        assert_eq!(config.previous_capacity(), 5);
        assert_eq!(config.salt_length(), 8);
        assert_eq!(config.request_tolerance(), Duration::from_secs(300));
    }

    #[rstest]
    #[case(90, 90)]
    #[case(90, 30)]
    #[case(0, 0)]
    fn test_policy_rejects_expiry_not_after_rotation(#[case] rotation: u32, #[case] expiry: u32) {
        let err = RotationPolicy::new(rotation, expiry).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrdering { .. }));
    }

    #[test]
    fn test_policy_ordering_message() {
        let err = RotationPolicy::new(90, 30).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expiry_threshold_days (30) must be greater than rotation_threshold_days (90)"
        );
    }

    #[test]
    fn test_short_key_rejected() {
        let err = CredentialConfig::builder().key_length_bytes(8).build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::BelowMinimum {
                field: "key_length_bytes",
                value: "8".into(),
                min: "16".into(),
            }
        );
    }

    #[rstest]
    #[case::salt(CredentialConfig::builder().salt_length(0).build(), "salt_length")]
    #[case::tolerance(CredentialConfig::builder().request_tolerance(Duration::ZERO).build(), "request_tolerance")]
    #[case::replay(CredentialConfig::builder().replay_capacity(0).build(), "replay_capacity")]
    fn test_zero_settings_rejected(
        #[case] result: Result<CredentialConfig, ConfigError>,
        #[case] expected_field: &str,
    ) {
        match result {
            Err(ConfigError::BelowMinimum { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected BelowMinimum, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: CredentialConfig =
            serde_json::from_str(r#"{"rotation_threshold_days": 30, "expiry_threshold_days": 60}"#)
                .expect("valid config");
        assert_eq!(config.rotation_policy().rotation_days(), 30);
        assert_eq!(config.rotation_policy().expiry_days(), 60);
        assert_eq!(config.key_length_bytes(), DEFAULT_KEY_LENGTH_BYTES);
    }

    #[test]
    fn test_deserialize_validates() {
        let result = serde_json::from_str::<CredentialConfig>(r#"{"expiry_threshold_days": 10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<CredentialConfig>(r#"{"ttl": 10}"#);
        assert!(result.is_err());
    }
}
