//! The multi-token session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fiscal_code::FiscalCode;
use crate::spid::SpidLevel;
use crate::token::{SessionToken, SessionTokens, TokenKind};
use crate::user::ValidatedUser;

/// One record per successful login.
///
/// Immutable once written: tokens are never rotated in place, the record is
/// destroyed as a whole on logout or administrative lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub fiscal_code: FiscalCode,
    pub session_token: SessionToken,
    pub wallet_token: SessionToken,
    pub my_portal_token: SessionToken,
    pub bpd_token: SessionToken,
    pub zendesk_token: SessionToken,
    pub fims_token: SessionToken,
    pub spid_level: SpidLevel,
    pub date_of_birth: chrono::NaiveDate,
    pub name: String,
    pub family_name: String,
    #[serde(default)]
    pub session_tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Assemble the record for a freshly authenticated user
    pub fn new(user: &ValidatedUser, tokens: &SessionTokens, created_at: DateTime<Utc>) -> Self {
        Self {
            fiscal_code: user.fiscal_code.clone(),
            session_token: tokens.session.clone(),
            wallet_token: tokens.wallet.clone(),
            my_portal_token: tokens.my_portal.clone(),
            bpd_token: tokens.bpd.clone(),
            zendesk_token: tokens.zendesk.clone(),
            fims_token: tokens.fims.clone(),
            spid_level: user.spid_level,
            date_of_birth: user.date_of_birth,
            name: user.name.clone(),
            family_name: user.family_name.clone(),
            session_tracking_id: Some(tokens.session_tracking_id.clone()),
            created_at,
        }
    }

    /// The token of a given kind
    pub fn token(&self, kind: TokenKind) -> &SessionToken {
        match kind {
            TokenKind::Session => &self.session_token,
            TokenKind::Wallet => &self.wallet_token,
            TokenKind::MyPortal => &self.my_portal_token,
            TokenKind::Bpd => &self.bpd_token,
            TokenKind::Zendesk => &self.zendesk_token,
            TokenKind::Fims => &self.fims_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user() -> ValidatedUser {
        ValidatedUser {
            fiscal_code: FiscalCode::parse("AAAAAA00A00A000A").unwrap(),
            name: "Carla".into(),
            family_name: "Rossi".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 12, 10).unwrap(),
            spid_level: SpidLevel::L2,
            spid_email: None,
        }
    }

    #[test]
    fn test_record_carries_all_six_tokens() {
        let tokens = SessionTokens::generate();
        let record = SessionRecord::new(&user(), &tokens, Utc::now());
        for kind in TokenKind::ALL {
            assert_eq!(record.token(kind), tokens.token(kind));
        }
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let tokens = SessionTokens::generate();
        let record = SessionRecord::new(&user(), &tokens, Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"sessionToken\""));
        assert!(json.contains("\"myPortalToken\""));
        assert!(json.contains("\"sessionTrackingId\""));
        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
