//! Per-tenant credential lifecycle: lazy creation, rotation and expiry.
//!
//! [`CredentialManager`] owns an in-memory cache of [`CredentialRecord`]s in
//! front of a [`CredentialStore`]. Reads are served from the cache whenever
//! possible; every mutation is persisted first and only then committed to
//! the cache.
//!
//! # Architecture
//!
//! ```text
//! get_active_key(tenant)
//!     → cache hit?            → return (read lock only)
//!     → take tenant mutex     → re-check cache
//!     → store.get(tenant)
//!         Some(record)        → cache as Persisted
//!         None                → generate, store.set, cache as Persisted
//!         transient error     → generate, cache as MemoryOnly (warn + audit)
//!         other error         → AuthError::KeyStorage
//! ```
//!
//! # Concurrency
//!
//! Creation, rotation and expiry for a tenant run under that tenant's
//! `tokio::sync::Mutex`; different tenants never contend. Cache hits take a
//! short read lock on the shared map and never wait on a tenant mutex. A
//! tenant's mutex is dropped from the lock map once no task holds or awaits
//! it, so lookups for unknown tenants leave nothing behind.
//!
//! # Durability
//!
//! A record the store could not durably hold is still usable but carries
//! [`Durability::MemoryOnly`]. It stays flagged until a later mutation for
//! that tenant is acknowledged by the store. Such a record disappears on
//! restart.
//!
//! Before a memory-only record is rotated or expired the store is read
//! again. If the store holds a record by then, that record replaces the
//! memory-only one and the mutation applies to it.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use chrono::{Duration, Utc};
use fail::fail_point;
use paygate_storage::{
    CredentialRecord, CredentialStore, MemoryCredentialStore, StorageResult, TenantId, Zeroizing,
    audit::{AuditAction, AuditEvent, AuditLogger, AuditResult, TracingAuditLogger, tenant_resource},
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    config::{CredentialConfig, RotationPolicy},
    error::Result,
    keygen,
    metrics::{CredentialMetrics, CredentialMetricsSnapshot},
};

const AUDIT_ACTOR: &str = "credential-manager";

/// Whether a record is backed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    /// The store holds this exact record.
    Persisted,
    /// The record exists only in this process.
    MemoryOnly {
        /// Why the store could not be used.
        reason: String,
    },
}

impl Durability {
    /// Returns `true` for [`Durability::Persisted`].
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

/// Result of [`CredentialManager::get_or_create`].
#[derive(Debug, Clone)]
pub struct CredentialLookup {
    /// The tenant's current record.
    pub record: CredentialRecord,
    /// Whether the record is durable.
    pub durability: Durability,
}

/// The secret a tenant currently signs with.
#[derive(Clone)]
pub struct ActiveKey {
    secret: Zeroizing<String>,
    durability: Durability,
}

impl ActiveKey {
    /// The hex-encoded secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the backing record is durable.
    #[must_use]
    pub fn durability(&self) -> &Durability {
        &self.durability
    }
}

impl fmt::Debug for ActiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveKey")
            .field("secret", &"<redacted>")
            .field("durability", &self.durability)
            .finish()
    }
}

/// What [`CredentialManager::check_and_rotate_if_due`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The record had passed the expiry threshold and was deleted.
    Deleted,
    /// The record had passed the rotation threshold and was rotated.
    Rotated,
    /// Nothing was due, or the tenant has no record.
    NoOp,
}

#[derive(Clone)]
struct CacheEntry {
    record: CredentialRecord,
    durability: Durability,
}

impl CacheEntry {
    fn persisted(record: CredentialRecord) -> Self {
        Self { record, durability: Durability::Persisted }
    }
}

impl From<CacheEntry> for CredentialLookup {
    fn from(entry: CacheEntry) -> Self {
        Self { record: entry.record, durability: entry.durability }
    }
}

/// Holds a tenant's mutex and prunes the lock map on release.
struct TenantGuard<'a> {
    manager: &'a CredentialManager,
    tenant: &'a TenantId,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.manager.release_tenant_lock(self.tenant);
    }
}

/// Cache-fronted owner of every tenant's credential record.
///
/// Construct one per process with [`new`](Self::new) and share it behind an
/// [`Arc`]; [`global`](Self::global) exists for callers that cannot thread
/// an instance through.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use paygate_authn::{CredentialConfig, CredentialManager};
/// use paygate_storage::{MemoryCredentialStore, TenantId};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let manager = CredentialManager::new(
///     Arc::new(MemoryCredentialStore::new()),
///     CredentialConfig::default(),
/// );
/// let tenant = TenantId::from("ak_1");
///
/// let first = manager.get_active_key(&tenant).await.unwrap();
/// let second = manager.get_active_key(&tenant).await.unwrap();
/// assert_eq!(first.secret(), second.secret());
///
/// let rotated = manager.rotate(&tenant, None).await.unwrap();
/// assert_ne!(rotated.as_str(), first.secret());
/// # });
/// ```
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    config: CredentialConfig,
    cache: RwLock<HashMap<TenantId, CacheEntry>>,
    tenant_locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
    audit_logger: Arc<dyn AuditLogger>,
    metrics: CredentialMetrics,
}

impl CredentialManager {
    /// Creates a manager over `store`.
    ///
    /// Audit events go to [`TracingAuditLogger`] unless replaced with
    /// [`with_audit_logger`](Self::with_audit_logger).
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, config: CredentialConfig) -> Self {
        Self {
            store,
            config,
            cache: RwLock::new(HashMap::new()),
            tenant_locks: Mutex::new(HashMap::new()),
            audit_logger: Arc::new(TracingAuditLogger),
            metrics: CredentialMetrics::new(),
        }
    }

    /// Creates a manager over a fresh [`MemoryCredentialStore`] with default
    /// configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()), CredentialConfig::default())
    }

    /// Replaces the audit logger.
    #[must_use]
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = logger;
        self
    }

    /// Process-wide manager over an in-memory store.
    ///
    /// Convenience for applications without dependency injection. Library
    /// code should accept a manager instead.
    pub fn global() -> &'static CredentialManager {
        static GLOBAL: OnceLock<CredentialManager> = OnceLock::new();
        GLOBAL.get_or_init(Self::in_memory)
    }

    /// The configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Current lifecycle counters.
    #[must_use]
    pub fn metrics(&self) -> CredentialMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of tenants with a cached record.
    #[must_use]
    pub fn cached_tenant_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Number of tenants whose mutex is currently held or awaited.
    #[must_use]
    pub fn locked_tenant_count(&self) -> usize {
        self.tenant_locks.lock().len()
    }

    /// Generates a secret of the configured length.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`](crate::AuthError::KeyGeneration)
    /// if the OS random source fails.
    pub fn generate_key(&self) -> Result<Zeroizing<String>> {
        keygen::generate_key(self.config.key_length_bytes())
    }

    /// Returns the tenant's record, creating and persisting one if none
    /// exists.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyGeneration`](crate::AuthError::KeyGeneration) if a
    ///   new secret was needed and could not be generated
    /// - [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) for
    ///   non-transient store read failures
    ///
    /// Transient read failures and failed writes of a new record yield a
    /// [`Durability::MemoryOnly`] record instead of an error.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn get_or_create(&self, tenant: &TenantId) -> Result<CredentialLookup> {
        if let Some(entry) = self.cached(tenant) {
            debug!(cache = "hit", "credential lookup");
            return Ok(entry.into());
        }
        debug!(cache = "miss", "credential lookup");

        let _guard = self.lock_tenant(tenant).await;
        if let Some(entry) = self.cached(tenant) {
            return Ok(entry.into());
        }
        self.load_or_create_locked(tenant).await.map(Into::into)
    }

    /// Returns the secret the tenant currently signs with.
    ///
    /// Without an intervening rotation or expiry, repeated calls return the
    /// same secret.
    ///
    /// # Errors
    ///
    /// Same as [`get_or_create`](Self::get_or_create).
    pub async fn get_active_key(&self, tenant: &TenantId) -> Result<ActiveKey> {
        let lookup = self.get_or_create(tenant).await?;
        Ok(ActiveKey {
            secret: Zeroizing::new(lookup.record.active().to_owned()),
            durability: lookup.durability,
        })
    }

    /// Returns the tenant's record without creating one.
    ///
    /// A tenant the store has never heard of is answered without taking its
    /// mutex.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) if the
    /// record is not cached and the store read fails.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn peek(&self, tenant: &TenantId) -> Result<Option<CredentialRecord>> {
        if let Some(entry) = self.cached(tenant) {
            return Ok(Some(entry.record));
        }
        if self.read_store(tenant).await?.is_none() {
            return Ok(None);
        }
        let _guard = self.lock_tenant(tenant).await;
        Ok(self.current_locked(tenant).await?.map(|entry| entry.record))
    }

    /// Retires the active key and installs `new_key` (or a generated one).
    ///
    /// The old active key moves to the head of the history, which is
    /// truncated to the configured capacity. A tenant without a record gets
    /// one created first. A memory-only record is only rotated if the store
    /// still has nothing for the tenant.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) if the store
    ///   cannot be read or rejects the write; cache and store are left
    ///   unchanged
    /// - [`AuthError::InvalidCredential`](crate::AuthError::InvalidCredential)
    ///   if `new_key` is empty
    /// - [`AuthError::KeyGeneration`](crate::AuthError::KeyGeneration)
    #[tracing::instrument(skip(self, new_key), fields(tenant = %tenant, supplied = new_key.is_some()))]
    pub async fn rotate(
        &self,
        tenant: &TenantId,
        new_key: Option<Zeroizing<String>>,
    ) -> Result<Zeroizing<String>> {
        let _guard = self.lock_tenant(tenant).await;
        let current = match self.current_locked(tenant).await? {
            Some(entry) => entry,
            None => self.create_locked(tenant).await?,
        };
        self.rotate_locked(tenant, &current.record, new_key).await
    }

    /// Expires or rotates the tenant's record if `policy` says it is due.
    ///
    /// 1. age ≥ expiry threshold: delete from store, then cache
    /// 2. age ≥ rotation threshold: rotate
    /// 3. otherwise nothing
    ///
    /// A tenant without a record is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) if the
    /// record cannot be read or the mutation cannot be persisted.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn check_and_rotate_if_due(
        &self,
        tenant: &TenantId,
        policy: RotationPolicy,
    ) -> Result<RotationOutcome> {
        let _guard = self.lock_tenant(tenant).await;
        let Some(current) = self.current_locked(tenant).await? else {
            return Ok(RotationOutcome::NoOp);
        };

        let age = current.record.age(Utc::now());
        if age >= policy.expiry_age() {
            self.expire_locked(tenant, age).await?;
            return Ok(RotationOutcome::Deleted);
        }
        if age >= policy.rotation_age() {
            self.rotate_locked(tenant, &current.record, None).await?;
            return Ok(RotationOutcome::Rotated);
        }
        Ok(RotationOutcome::NoOp)
    }

    /// [`check_and_rotate_if_due`](Self::check_and_rotate_if_due) with the
    /// configured policy.
    ///
    /// # Errors
    ///
    /// Same as [`check_and_rotate_if_due`](Self::check_and_rotate_if_due).
    pub async fn check_and_rotate(&self, tenant: &TenantId) -> Result<RotationOutcome> {
        self.check_and_rotate_if_due(tenant, self.config.rotation_policy()).await
    }

    /// Deletes the tenant's record if it is at least `expiry_days` old.
    ///
    /// Returns whether a record was deleted. Never creates a record.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyStorage`](crate::AuthError::KeyStorage) if the
    /// record cannot be read or the deletion cannot be persisted.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn delete_if_expired(&self, tenant: &TenantId, expiry_days: u32) -> Result<bool> {
        let _guard = self.lock_tenant(tenant).await;
        let Some(current) = self.current_locked(tenant).await? else {
            return Ok(false);
        };

        let age = current.record.age(Utc::now());
        if age < Duration::days(i64::from(expiry_days)) {
            return Ok(false);
        }
        self.expire_locked(tenant, age).await?;
        Ok(true)
    }

    /// Drops the cached record so the next read reloads it from the store.
    ///
    /// Use when another process may have rotated the tenant's key.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn invalidate(&self, tenant: &TenantId) {
        let _guard = self.lock_tenant(tenant).await;
        if self.cache.write().remove(tenant).is_some() {
            self.emit_audit(
                AuditAction::InvalidateCache,
                tenant,
                AuditResult::Success,
                HashMap::new(),
            )
            .await;
        }
    }

    fn cached(&self, tenant: &TenantId) -> Option<CacheEntry> {
        self.cache.read().get(tenant).cloned()
    }

    fn commit(&self, tenant: &TenantId, entry: CacheEntry) {
        self.cache.write().insert(tenant.clone(), entry);
    }

    async fn lock_tenant<'a>(&'a self, tenant: &'a TenantId) -> TenantGuard<'a> {
        let lock = Arc::clone(self.tenant_locks.lock().entry(tenant.clone()).or_default());
        TenantGuard { manager: self, tenant, guard: Some(lock.lock_owned().await) }
    }

    /// Drops the tenant's mutex once nobody holds or awaits it.
    fn release_tenant_lock(&self, tenant: &TenantId) {
        let mut locks = self.tenant_locks.lock();
        if locks.get(tenant).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(tenant);
        }
    }

    async fn read_store(&self, tenant: &TenantId) -> Result<Option<CredentialRecord>> {
        self.store.get(tenant).await.map_err(|e| {
            self.metrics.record_store_failure();
            warn!(error = %e, "credential store read failed");
            e.into()
        })
    }

    /// The record a mutation should start from.
    ///
    /// A persisted cache entry is trusted as is. A memory-only entry is
    /// checked against the store, and a stored record wins.
    async fn current_locked(&self, tenant: &TenantId) -> Result<Option<CacheEntry>> {
        let cached = self.cached(tenant);
        if cached.as_ref().is_some_and(|entry| entry.durability.is_persisted()) {
            return Ok(cached);
        }
        match self.read_store(tenant).await? {
            Some(record) => {
                if cached.is_some() {
                    info!("stored credential supersedes memory-only credential");
                }
                let entry = CacheEntry::persisted(record);
                self.commit(tenant, entry.clone());
                Ok(Some(entry))
            },
            None => Ok(cached),
        }
    }

    async fn load_or_create_locked(&self, tenant: &TenantId) -> Result<CacheEntry> {
        match self.store.get(tenant).await {
            Ok(Some(record)) => {
                debug!("loaded credential from store");
                let entry = CacheEntry::persisted(record);
                self.commit(tenant, entry.clone());
                Ok(entry)
            },
            Ok(None) => self.create_locked(tenant).await,
            Err(e) if e.is_transient() => {
                self.metrics.record_store_failure();
                let record = self.new_record()?;
                self.metrics.record_created();
                self.degrade(tenant, record, format!("store read failed: {e}")).await
            },
            Err(e) => {
                self.metrics.record_store_failure();
                warn!(error = %e, "credential store read failed");
                Err(e.into())
            },
        }
    }

    async fn create_locked(&self, tenant: &TenantId) -> Result<CacheEntry> {
        let record = self.new_record()?;
        self.metrics.record_created();
        if let Err(e) = self.persist(tenant, Some(&record)).await {
            self.metrics.record_store_failure();
            return self.degrade(tenant, record, format!("store write failed: {e}")).await;
        }

        info!("credential created");
        self.emit_audit(AuditAction::CreateCredential, tenant, AuditResult::Success, HashMap::new())
            .await;
        let entry = CacheEntry::persisted(record);
        self.commit(tenant, entry.clone());
        Ok(entry)
    }

    async fn degrade(
        &self,
        tenant: &TenantId,
        record: CredentialRecord,
        reason: String,
    ) -> Result<CacheEntry> {
        self.metrics.record_degraded();
        warn!(reason = %reason, "serving memory-only credential; it will not survive a restart");
        self.emit_audit(
            AuditAction::DegradedCredential,
            tenant,
            AuditResult::Failure(reason.clone()),
            HashMap::new(),
        )
        .await;
        let entry = CacheEntry { record, durability: Durability::MemoryOnly { reason } };
        self.commit(tenant, entry.clone());
        Ok(entry)
    }

    async fn rotate_locked(
        &self,
        tenant: &TenantId,
        current: &CredentialRecord,
        new_key: Option<Zeroizing<String>>,
    ) -> Result<Zeroizing<String>> {
        let new_key = match new_key {
            Some(key) => key,
            None => self.generate_key()?,
        };
        let rotated =
            current.rotate(new_key.as_str(), self.config.previous_capacity(), Utc::now())?;

        if let Err(e) = self.persist(tenant, Some(&rotated)).await {
            self.metrics.record_store_failure();
            warn!(error = %e, "rotation not committed: store write failed");
            self.emit_audit(
                AuditAction::RotateCredential,
                tenant,
                AuditResult::Failure(e.to_string()),
                HashMap::new(),
            )
            .await;
            return Err(e.into());
        }

        let previous_len = rotated.previous_len();
        self.commit(tenant, CacheEntry::persisted(rotated));
        self.metrics.record_rotated();
        info!(previous_len, "credential rotated");
        self.emit_audit(
            AuditAction::RotateCredential,
            tenant,
            AuditResult::Success,
            HashMap::from([("previous_len".to_owned(), previous_len.to_string())]),
        )
        .await;
        Ok(new_key)
    }

    async fn expire_locked(&self, tenant: &TenantId, age: Duration) -> Result<()> {
        let age_days = age.num_days().to_string();
        if let Err(e) = self.persist(tenant, None).await {
            self.metrics.record_store_failure();
            warn!(error = %e, "expiry not committed: store delete failed");
            self.emit_audit(
                AuditAction::ExpireCredential,
                tenant,
                AuditResult::Failure(e.to_string()),
                HashMap::from([("age_days".to_owned(), age_days)]),
            )
            .await;
            return Err(e.into());
        }

        self.cache.write().remove(tenant);
        self.metrics.record_expired();
        info!(age_days = %age_days, "credential expired");
        self.emit_audit(
            AuditAction::ExpireCredential,
            tenant,
            AuditResult::Success,
            HashMap::from([("age_days".to_owned(), age_days)]),
        )
        .await;
        Ok(())
    }

    fn new_record(&self) -> Result<CredentialRecord> {
        let key = self.generate_key()?;
        Ok(CredentialRecord::new(key.as_str(), Utc::now())?)
    }

    async fn persist(
        &self,
        tenant: &TenantId,
        record: Option<&CredentialRecord>,
    ) -> StorageResult<()> {
        fail_point!("manager-before-store-write", |_| {
            Err(paygate_storage::StorageError::internal("injected failure before store write"))
        });
        self.store.set(tenant, record).await
    }

    async fn emit_audit(
        &self,
        action: AuditAction,
        tenant: &TenantId,
        result: AuditResult,
        metadata: HashMap<String, String>,
    ) {
        let event = AuditEvent::builder()
            .actor(AUDIT_ACTOR)
            .action(action)
            .resource(tenant_resource(tenant))
            .result(result)
            .metadata(metadata)
            .build();
        self.audit_logger.log(&event).await;
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("cached_tenants", &self.cached_tenant_count())
            .finish_non_exhaustive()
    }
}
