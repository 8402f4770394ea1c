//! Repository traits
//!
//! Async storage interfaces consumed by the managers in `tessera-auth-core`.
//! The session store is Redis-backed in production; the lock table sits on
//! a durable table service reached through a transport client outside this
//! workspace.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_types::{
    AssertionRef, DomainError, DomainResult, FiscalCode, LollipopData, LoginType, SessionRecord,
    SessionToken, TokenKind,
};

/// Multi-token session repository.
///
/// One canonical record per login plus one reverse-lookup entry per token
/// kind, all sharing a TTL. Values are replaced whole, never mutated in
/// place.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write the session record and its per-token reverse entries.
    ///
    /// Returns `false` when any individual write reports an unexpected
    /// low-level reply, so callers can treat a partially written session as
    /// a retryable failure rather than an error.
    async fn set(&self, record: &SessionRecord, ttl: Duration) -> DomainResult<bool>;

    /// Resolve a token of the given kind to its session record
    async fn get(
        &self,
        kind: TokenKind,
        token: &SessionToken,
    ) -> DomainResult<Option<SessionRecord>>;

    /// Delete the record and all reverse entries.
    ///
    /// `true` only if the primary session key was actually removed; `false`
    /// means there was nothing to delete, which callers must treat as an
    /// application error, not idempotent success.
    async fn delete_user(&self, record: &SessionRecord) -> DomainResult<bool>;

    /// Register a legacy session in the per-user session index
    async fn add_session_info(
        &self,
        fiscal_code: &FiscalCode,
        token: &SessionToken,
        ttl: Duration,
    ) -> DomainResult<bool>;

    /// Members of the legacy session index for a user.
    ///
    /// Dangling members (session expired, index entry still present) are
    /// expected and must be tolerated by callers.
    async fn read_session_tokens(&self, fiscal_code: &FiscalCode)
        -> DomainResult<Vec<SessionToken>>;

    /// The user's current key binding, if any
    async fn lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Option<LollipopData>>;

    /// Replace the user's key binding
    async fn set_lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
        data: &LollipopData,
        ttl: Duration,
    ) -> DomainResult<bool>;

    /// Remove the user's key binding; `true` if a binding was removed
    async fn del_lollipop_data_for_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool>;

    /// Mark a fiscal code as undergoing account deletion
    async fn set_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<()>;

    /// Remove the deletion mark; `true` if the user was marked
    async fn unset_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool>;

    /// Whether the fiscal code is undergoing account deletion
    async fn is_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool>;

    /// The assertion ref of the current key binding, if any
    async fn lollipop_assertion_ref_for_user(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Option<AssertionRef>> {
        Ok(self
            .lollipop_data_for_user(fiscal_code)
            .await?
            .map(|data| data.assertion_ref))
    }

    /// Whether the user has any live session.
    ///
    /// An `LV` key binding alone counts as an active session: LV is
    /// single-session by construction and tracked only via the Lollipop
    /// TTL. Otherwise the legacy index is scanned and each member
    /// dereferenced; missing or undecodable records count as inactive to
    /// tolerate partial expiry races.
    async fn has_active_session_or_lv(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        if let Some(data) = self.lollipop_data_for_user(fiscal_code).await? {
            if data.login_type == LoginType::Lv {
                return Ok(true);
            }
        }
        for token in self.read_session_tokens(fiscal_code).await? {
            match self.get(TokenKind::Session, &token).await {
                Ok(Some(_)) => return Ok(true),
                Ok(None) | Err(DomainError::Format(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// Destroy every session reachable from the legacy index.
    ///
    /// Used by the administrative lock path. Returns the number of records
    /// removed; dangling index members are skipped.
    async fn delete_sessions_for_user(&self, fiscal_code: &FiscalCode) -> DomainResult<u64> {
        let mut deleted = 0;
        for token in self.read_session_tokens(fiscal_code).await? {
            match self.get(TokenKind::Session, &token).await {
                Ok(Some(record)) => {
                    if self.delete_user(&record).await? {
                        deleted += 1;
                    }
                }
                Ok(None) | Err(DomainError::Format(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }
}

/// Caller-supplied identifier distinguishing lock records for one user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockCode(String);

impl UnlockCode {
    /// Parse an unlock code: exactly nine digits
    pub fn parse(s: &str) -> DomainResult<Self> {
        if s.len() == 9 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(DomainError::format(format!("malformed unlock code: {s}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnlockCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row per (fiscal code, unlock code) pair in the durable lock table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationLockRecord {
    pub fiscal_code: FiscalCode,
    pub unlock_code: UnlockCode,
    pub created_at: DateTime<Utc>,
    pub released: bool,
}

/// Durable lock table contract.
///
/// Row creation conflicts on the exact (fiscal code, unlock code) key; that
/// conflict is the only cross-request mutual-exclusion primitive in the
/// system. Rows are released, never physically deleted.
#[async_trait]
pub trait LockTable: Send + Sync {
    /// Create a lock row. `Conflict` if the identical row already exists.
    async fn insert(&self, record: &AuthenticationLockRecord) -> DomainResult<()>;

    /// Rows for the fiscal code with `released = false`
    async fn active_locks(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<AuthenticationLockRecord>>;

    /// Flip `released` on every named row in one batch.
    ///
    /// All-or-nothing: if any named row cannot be found the whole batch
    /// fails and no row is released.
    async fn release(
        &self,
        fiscal_code: &FiscalCode,
        unlock_codes: &[UnlockCode],
    ) -> DomainResult<()>;
}
