//! Storage error types and result alias.
//!
//! Every [`CredentialStore`](crate::CredentialStore) backend maps its internal
//! failures onto [`StorageError`]. Configuration validation across the
//! workspace reports [`ConfigError`].
//!
//! # Error Types
//!
//! - [`StorageError::Connection`] - Network or connection-related failures
//! - [`StorageError::Timeout`] - Operation exceeded time limit
//! - [`StorageError::Serialization`] - A stored record could not be encoded or decoded
//! - [`StorageError::Internal`] - Backend-specific internal errors
//!
//! Connection and timeout failures are *transient*: callers may degrade to
//! cached or memory-only state. Everything else is treated as permanent.
//!
//! # Example
//!
//! ```
//! use paygate_storage::{StorageError, StorageResult};
//!
//! fn lookup(_tenant: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::connection("credential store unreachable"))
//! }
//!
//! assert!(lookup("ak_1").unwrap_err().is_transient());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during credential store operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Connection or network error.
    ///
    /// The store could not be reached (connection refused, DNS failure,
    /// broken pipe). Reads may degrade to memory-only state on this error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization error.
    ///
    /// A credential record could not be encoded for storage or decoded when
    /// retrieved. This indicates corruption or schema incompatibility and is
    /// never retried or degraded around.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` for failures where the store may recover on its own
    /// (connection loss, timeouts).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric setting is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// The minimum accepted value, rendered for display.
        min: String,
    },

    /// Two settings violate a required ordering.
    #[error("{greater} ({greater_value}) must be greater than {lesser} ({lesser_value})")]
    InvalidOrdering {
        /// Field that must hold the larger value.
        greater: &'static str,
        /// Its configured value.
        greater_value: String,
        /// Field that must hold the smaller value.
        lesser: &'static str,
        /// Its configured value.
        lesser_value: String,
    },
}
