//! Authenticated user types
//!
//! The SAML/XML machinery lives outside the core; what arrives here is the
//! already-parsed assertion payload, which still has to be decoded into a
//! typed user before a session can be established.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::fiscal_code::FiscalCode;
use crate::spid::SpidLevel;

/// Raw identity attributes extracted from a SPID/CIE assertion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    pub fiscal_number: Option<String>,
    pub name: Option<String>,
    pub family_name: Option<String>,
    /// ISO date, `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    pub spid_level: Option<String>,
    /// Entity ID of the identity provider that produced the assertion
    pub issuer: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A fully decoded, typed user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedUser {
    pub fiscal_code: FiscalCode,
    pub name: String,
    pub family_name: String,
    pub date_of_birth: NaiveDate,
    pub spid_level: SpidLevel,
    #[serde(default)]
    pub spid_email: Option<String>,
}

impl ValidatedUser {
    /// Age in whole years at the given date
    pub fn age_at(&self, today: NaiveDate) -> u32 {
        let mut age = today.year() - self.date_of_birth.year();
        if (today.month(), today.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }
}

impl TryFrom<&AssertionPayload> for ValidatedUser {
    type Error = DomainError;

    fn try_from(payload: &AssertionPayload) -> DomainResult<Self> {
        let fiscal_code = payload
            .fiscal_number
            .as_deref()
            .ok_or_else(|| DomainError::format("assertion is missing fiscalNumber"))
            .and_then(FiscalCode::parse)?;
        let name = payload
            .name
            .clone()
            .ok_or_else(|| DomainError::format("assertion is missing name"))?;
        let family_name = payload
            .family_name
            .clone()
            .ok_or_else(|| DomainError::format("assertion is missing familyName"))?;
        let date_of_birth = payload
            .date_of_birth
            .as_deref()
            .ok_or_else(|| DomainError::format("assertion is missing dateOfBirth"))
            .and_then(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| DomainError::format(format!("dateOfBirth: {e}")))
            })?;
        let spid_level = payload
            .spid_level
            .as_deref()
            .ok_or_else(|| DomainError::format("assertion is missing spidLevel"))
            .and_then(SpidLevel::parse)?;

        Ok(Self {
            fiscal_code,
            name,
            family_name,
            date_of_birth,
            spid_level,
            spid_email: payload.email.clone(),
        })
    }
}
