//! Login outcomes and typed rejections

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A policy denial. User-facing: always produces a redirect or structured
/// error body, never a 5xx.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginRejection {
    /// The assertion payload could not be decoded into a typed user
    #[error("invalid assertion payload: {0}")]
    InvalidAssertion(String),

    /// The asserting identity differs from the device's current user
    #[error("authenticated user does not match the asserted identity")]
    FiscalCodeMismatch,

    /// CIE test-environment login without an allow-list entry
    #[error("CIE test environment login is not allowed for this user")]
    CieTestNotAllowed,

    /// User is below the minimum app age
    #[error("user is below the minimum age")]
    AgeBlock,

    /// Account deletion in progress
    #[error("account deletion is in progress for this user")]
    BlockedUser,

    /// An authentication lock is active for the fiscal code
    #[error("authentication is locked for this user")]
    AuthenticationLocked,

    /// The key-binding validation cookie was absent or wrong
    #[error("key binding cookie validation failed")]
    CookieMismatch,
}

impl LoginRejection {
    /// Stable code for the HTTP layer and audit trail
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAssertion(_) => "invalid_assertion",
            Self::FiscalCodeMismatch => "cf_mismatch",
            Self::CieTestNotAllowed => "cie_test_forbidden",
            Self::AgeBlock => "age_block",
            Self::BlockedUser => "ongoing_user_deletion",
            Self::AuthenticationLocked => "auth_lock",
            Self::CookieMismatch => "cookie_validation_failed",
        }
    }
}

/// Result of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Authentication succeeded; redirect with the session token embedded
    Redirect { url: String },
    /// A policy denial; the attempt is over
    Rejected(LoginRejection),
}

/// Answer for `GetSessionState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub active: bool,
}
