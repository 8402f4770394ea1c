//! Fiscal code identity type

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Italian fiscal code, the identity key of every session and lock record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalCode(String);

impl FiscalCode {
    /// Parse and validate a fiscal code.
    ///
    /// Accepts the standard 16-character shape (6 letters, 2 digits, a
    /// letter, 2 digits, a letter, 3 digits, a check letter), uppercasing
    /// the input first.
    pub fn parse(s: &str) -> DomainResult<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        let b = normalized.as_bytes();
        if b.len() != 16 {
            return Err(DomainError::format(format!(
                "fiscal code must be 16 characters, got {}",
                b.len()
            )));
        }
        let shape_ok = b[..6].iter().all(u8::is_ascii_uppercase)
            && b[6..8].iter().all(u8::is_ascii_digit)
            && b[8].is_ascii_uppercase()
            && b[9..11].iter().all(u8::is_ascii_digit)
            && b[11].is_ascii_uppercase()
            && b[12..15].iter().all(u8::is_ascii_digit)
            && b[15].is_ascii_uppercase();
        if !shape_ok {
            return Err(DomainError::format(format!(
                "malformed fiscal code: {normalized}"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FiscalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FiscalCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
