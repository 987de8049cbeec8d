//! Audit logging for credential lifecycle operations.
//!
//! Every mutation of a tenant's credential record (creation, rotation,
//! expiry) and every fallback to an unpersisted record is reported through
//! an [`AuditLogger`], giving operators a trail of what changed, for which
//! tenant, when, and whether it succeeded.
//!
//! # Architecture
//!
//! - [`TracingAuditLogger`]: Emits structured `tracing` events at INFO, suitable for log
//!   aggregation and SIEM integration.
//! - [`NoopAuditLogger`]: Discards events.
//! - Custom implementations can write to databases or external audit services.
//!
//! Secrets never appear in audit events; only the tenant identifier does.
//!
//! # Usage
//!
//! ```no_run
//! use paygate_storage::audit::{
//!     AuditAction, AuditEvent, AuditLogger, AuditResult, TracingAuditLogger, tenant_resource,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let logger = TracingAuditLogger;
//! let event = AuditEvent::builder()
//!     .actor("credential-manager")
//!     .action(AuditAction::RotateCredential)
//!     .resource(tenant_resource("ak_1"))
//!     .result(AuditResult::Success)
//!     .build();
//! logger.log(&event).await;
//! # });
//! ```

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Action performed on a tenant's credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// A first credential was generated for a tenant.
    CreateCredential,
    /// The active key was retired and replaced.
    RotateCredential,
    /// A stale record was deleted.
    ExpireCredential,
    /// A record is being served without durable backing.
    DegradedCredential,
    /// A cached record was dropped.
    InvalidateCache,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCredential => write!(f, "create_credential"),
            Self::RotateCredential => write!(f, "rotate_credential"),
            Self::ExpireCredential => write!(f, "expire_credential"),
            Self::DegradedCredential => write!(f, "degraded_credential"),
            Self::InvalidateCache => write!(f, "invalidate_cache"),
        }
    }
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Operation completed successfully.
    Success,
    /// Operation failed with the given reason.
    Failure(String),
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

/// Structured audit event for a credential operation.
#[derive(Debug, Clone, bon::Builder)]
pub struct AuditEvent {
    /// When the event occurred (defaults to now).
    #[builder(default = Utc::now())]
    pub timestamp: DateTime<Utc>,
    /// Component or identity performing the operation.
    #[builder(into)]
    pub actor: String,
    /// The action that was performed.
    pub action: AuditAction,
    /// Resource identifier (e.g., "tenant:ak_1").
    #[builder(into)]
    pub resource: String,
    /// Outcome of the operation.
    pub result: AuditResult,
    /// Additional context (e.g., retained history length, degradation reason).
    #[builder(default)]
    pub metadata: HashMap<String, String>,
}

/// Trait for audit log backends.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records an audit event.
    async fn log(&self, event: &AuditEvent);
}

#[async_trait]
impl<L: AuditLogger + ?Sized> AuditLogger for std::sync::Arc<L> {
    async fn log(&self, event: &AuditEvent) {
        (**self).log(event).await;
    }
}

/// Audit logger that emits structured `tracing` events.
///
/// Field mapping:
/// - `audit.timestamp`: RFC 3339 timestamp
/// - `audit.actor`: who performed the action
/// - `audit.action`: the operation (e.g., "rotate_credential")
/// - `audit.resource`: what was affected
/// - `audit.result`: "success" or "failure: ..."
/// - `audit.metadata`: additional context as `k=v` pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        let mut pairs: Vec<_> = event.metadata.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        let metadata_str = pairs.join(", ");

        tracing::info!(
            audit.timestamp = %event.timestamp.to_rfc3339(),
            audit.actor = %event.actor,
            audit.action = %event.action,
            audit.resource = %event.resource,
            audit.result = %event.result,
            audit.metadata = %metadata_str,
            "audit_event"
        );
    }
}

/// Audit logger that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _event: &AuditEvent) {}
}

/// Resource identifier for a tenant's credential record.
pub fn tenant_resource(tenant: impl fmt::Display) -> String {
    format!("tenant:{tenant}")
}
