//! External collaborator contracts
//!
//! The core talks to the remote key authority, the profile service, the
//! notification queue and the audit event bus only through these traits.
//! Transport implementations live outside this workspace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_types::{
    AssertionRef, DomainResult, FiscalCode, LoginEvent, RejectedLoginEvent, ValidatedUser,
};

/// A key binding acknowledged by the remote key authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedKey {
    pub assertion_ref: AssertionRef,
    pub expires_at: DateTime<Utc>,
}

/// Remote key authority (Lollipop function)
#[async_trait]
pub trait LollipopApi: Send + Sync {
    /// Bind a public-key assertion ref to a fiscal code until `expires_at`
    async fn activate(
        &self,
        assertion_ref: &AssertionRef,
        fiscal_code: &FiscalCode,
        assertion: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<ActivatedKey>;

    /// Revoke a previously bound key. Best-effort only.
    async fn revoke(&self, assertion_ref: &AssertionRef) -> DomainResult<()>;
}

/// Minimal view of a user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub fiscal_code: FiscalCode,
    #[serde(default)]
    pub email: Option<String>,
}

/// Input for profile creation on first login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub fiscal_code: FiscalCode,
    #[serde(default)]
    pub email: Option<String>,
}

/// Profile service
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// `Ok(None)` when no profile exists for the fiscal code
    async fn get_profile(&self, fiscal_code: &FiscalCode) -> DomainResult<Option<Profile>>;

    /// Create a profile; `Conflict` if one already exists
    async fn create_profile(&self, new_profile: &NewProfile) -> DomainResult<Profile>;
}

/// Downstream notification endpoint and installation registry
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Tell the notification pipeline that the user just logged in
    async fn notify_login(&self, user: &ValidatedUser) -> DomainResult<()>;

    /// Drop the user's old push-notification installation.
    /// Fire-and-forget from the orchestrator's perspective.
    async fn delete_installation(&self, fiscal_code: &FiscalCode) -> DomainResult<()>;
}

/// Audit event bus
#[async_trait]
pub trait AuditBus: Send + Sync {
    async fn emit_login(&self, event: &LoginEvent) -> DomainResult<()>;

    /// Failures here must be caught by the caller and turned into a
    /// telemetry record carrying the full payload, never propagated.
    async fn emit_rejected_login(&self, event: &RejectedLoginEvent) -> DomainResult<()>;
}
