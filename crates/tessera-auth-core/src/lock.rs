//! Authentication lock manager
//!
//! Per fiscal code the states are Unlocked -> Locked -> Unlocked; there is
//! no permanently-locked state. The durable-table conflict on the exact
//! (fiscal code, unlock code) row is the only cross-request mutual
//! exclusion in the system: two different unlock codes can coexist, so
//! unlock-code uniqueness policy belongs to the caller.

use std::sync::Arc;

use chrono::Utc;

use tessera_store::{AuthenticationLockRecord, LockTable, UnlockCode};
use tessera_types::{DomainError, DomainResult, FiscalCode};

/// Lock/unlock/query over the durable lock table
#[derive(Clone)]
pub struct AuthenticationLockManager<T: LockTable> {
    table: Arc<T>,
}

impl<T: LockTable> AuthenticationLockManager<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self { table }
    }

    /// Create one lock record.
    ///
    /// A conflicting row (same fiscal code and unlock code) is reported as
    /// a generic creation failure, not a distinct already-locked signal;
    /// callers wanting idempotency must mint a fresh unlock code per
    /// attempt.
    pub async fn lock(&self, fiscal_code: &FiscalCode, unlock_code: &UnlockCode) -> DomainResult<()> {
        let record = AuthenticationLockRecord {
            fiscal_code: fiscal_code.clone(),
            unlock_code: unlock_code.clone(),
            created_at: Utc::now(),
            released: false,
        };
        self.table.insert(&record).await.map_err(|e| {
            tracing::error!(error = %e, "authentication lock creation failed");
            DomainError::generic("could not create the authentication lock")
        })
    }

    /// True iff at least one unreleased record exists.
    /// Always a live query against the durable store, never cached.
    pub async fn is_locked(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        Ok(!self.table.active_locks(fiscal_code).await?.is_empty())
    }

    /// The unreleased records for the fiscal code
    pub async fn active_locks(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<AuthenticationLockRecord>> {
        self.table.active_locks(fiscal_code).await
    }

    /// Release every named record in one batch; all-or-nothing
    pub async fn unlock(
        &self,
        fiscal_code: &FiscalCode,
        unlock_codes: &[UnlockCode],
    ) -> DomainResult<()> {
        self.table.release(fiscal_code, unlock_codes).await
    }
}
