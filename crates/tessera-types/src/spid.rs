//! SPID assurance levels

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// SPID assurance level carried by the identity assertion.
///
/// Ordered: `L1 < L2 < L3`. `L3` is the highest tier and is exempt from the
/// authentication-lock check by policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpidLevel {
    L1,
    L2,
    L3,
}

impl SpidLevel {
    /// Parse the level from the SAML authn-context URI or the short form
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "L1" | "https://www.spid.gov.it/SpidL1" => Ok(Self::L1),
            "L2" | "https://www.spid.gov.it/SpidL2" => Ok(Self::L2),
            "L3" | "https://www.spid.gov.it/SpidL3" => Ok(Self::L3),
            other => Err(DomainError::format(format!("unknown spid level: {other}"))),
        }
    }

    /// Whether this is the highest assurance tier
    pub fn is_highest(self) -> bool {
        self == Self::L3
    }
}

impl std::fmt::Display for SpidLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        };
        write!(f, "{s}")
    }
}
