//! Lease-based mutual exclusion for sync runs.
//!
//! One sync may run per (tenant, loan_type) at a time. Acquisition is a
//! compare-and-set against the lease store; a live lease held by someone else
//! means the caller backs off with a busy signal instead of waiting. Leases
//! carry a TTL so a crashed worker cannot block the key forever.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::records::LoanType;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lease store failure: {message}")]
    Store { message: String },
}

/// Backing store for leases. CAS semantics: `try_acquire` succeeds only when
/// the key is free or its current lease has expired.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn try_acquire(
        &self,
        key: &str,
        holder: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError>;

    /// Release the lease iff still held by `holder`.
    async fn release(&self, key: &str, holder: Uuid) -> Result<(), LockError>;

    /// Extend the lease iff still held by `holder`.
    async fn renew(&self, key: &str, holder: Uuid, ttl: Duration) -> Result<bool, LockError>;
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    holder: Uuid,
    expires_at: DateTime<Utc>,
}

/// Process-local lease store.
#[derive(Default)]
pub struct MemoryLeaseStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_map(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Lease>>, LockError> {
        self.leases.lock().map_err(|_| LockError::Store {
            message: "lease map mutex poisoned".to_string(),
        })
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn try_acquire(
        &self,
        key: &str,
        holder: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let now = Utc::now();
        let mut leases = self.lock_map()?;
        if let Some(lease) = leases.get(key)
            && lease.expires_at > now
            && lease.holder != holder
        {
            return Ok(false);
        }
        leases.insert(
            key.to_string(),
            Lease {
                holder,
                expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, holder: Uuid) -> Result<(), LockError> {
        let mut leases = self.lock_map()?;
        if let Some(lease) = leases.get(key)
            && lease.holder == holder
        {
            leases.remove(key);
        }
        Ok(())
    }

    async fn renew(&self, key: &str, holder: Uuid, ttl: Duration) -> Result<bool, LockError> {
        let now = Utc::now();
        let mut leases = self.lock_map()?;
        match leases.get_mut(key) {
            Some(lease) if lease.holder == holder && lease.expires_at > now => {
                lease.expires_at = now + chrono::Duration::from_std(ttl).unwrap_or_default();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A held lease. Returned by [`LockManager::acquire`]; the caller is
/// responsible for releasing it when the run reaches a terminal state.
#[derive(Debug, Clone)]
pub struct SyncLease {
    pub key: String,
    pub holder: Uuid,
}

/// Acquires and maintains per-(tenant, loan_type) sync leases.
pub struct LockManager {
    store: std::sync::Arc<dyn LeaseStore>,
    ttl: Duration,
}

impl LockManager {
    pub fn new(store: std::sync::Arc<dyn LeaseStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(tenant_id: &str, loan_type: LoanType) -> String {
        format!("sync_lock:{tenant_id}:{}", loan_type.as_str())
    }

    /// `Ok(Some(lease))` when acquired, `Ok(None)` when another run holds it.
    pub async fn acquire(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
    ) -> Result<Option<SyncLease>, LockError> {
        let key = Self::key(tenant_id, loan_type);
        let holder = Uuid::new_v4();
        if self.store.try_acquire(&key, holder, self.ttl).await? {
            debug!(key, %holder, "sync lease acquired");
            Ok(Some(SyncLease { key, holder }))
        } else {
            Ok(None)
        }
    }

    pub async fn renew(&self, lease: &SyncLease) -> Result<bool, LockError> {
        self.store.renew(&lease.key, lease.holder, self.ttl).await
    }

    pub async fn release(&self, lease: &SyncLease) -> Result<(), LockError> {
        debug!(key = lease.key, holder = %lease.holder, "sync lease released");
        self.store.release(&lease.key, lease.holder).await
    }
}
