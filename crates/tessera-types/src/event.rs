//! Audit events published on login outcomes
//!
//! Accepted logins produce a `LoginEvent`; policy denials produce a
//! `RejectedLoginEvent`. Delivery guarantees differ: rejected-login emission
//! is always best-effort, successful-login emission is part of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fiscal_code::FiscalCode;
use crate::lollipop::{AssertionRef, LoginType};

/// How the accepted login relates to the user's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginScenario {
    /// First login ever, a profile was created
    NewUser,
    Standard,
    /// Re-login from an already-authenticated device
    Relogin,
    /// Accepted login right after an identity-mismatch rejection on the
    /// same device
    ReloginAfterMismatch,
}

/// Why a login was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CfMismatch,
    AgeBlock,
    OngoingUserDeletion,
    AuthLock,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CfMismatch => "cf_mismatch",
            Self::AgeBlock => "age_block",
            Self::OngoingUserDeletion => "ongoing_user_deletion",
            Self::AuthLock => "auth_lock",
        }
    }
}

/// Structured event for an accepted login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginEvent {
    pub fiscal_code: FiscalCode,
    #[serde(default)]
    pub assertion_ref: Option<AssertionRef>,
    pub login_type: LoginType,
    pub scenario: LoginScenario,
    pub ts: DateTime<Utc>,
}

/// Structured event for a denied login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLoginEvent {
    pub fiscal_code: FiscalCode,
    pub reason: RejectionReason,
    pub ts: DateTime<Utc>,
}
