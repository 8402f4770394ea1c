//! Opaque bearer tokens
//!
//! Every session owns six independent tokens, one per downstream surface.
//! Tokens are random, never derived from each other, and individually
//! revocable.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of random bytes per token (hex-encoded to 96 characters)
const TOKEN_BYTES: usize = 48;

/// The downstream surface a token grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Wallet,
    MyPortal,
    Bpd,
    Zendesk,
    Fims,
}

impl TokenKind {
    /// All kinds, in reverse-index write order
    pub const ALL: [TokenKind; 6] = [
        TokenKind::Session,
        TokenKind::Wallet,
        TokenKind::MyPortal,
        TokenKind::Bpd,
        TokenKind::Zendesk,
        TokenKind::Fims,
    ];
}

/// An opaque bearer token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an existing token value (e.g. read back from storage)
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The full token set minted for one login, plus the session tracking id.
///
/// The seven values have no data dependency on each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub session: SessionToken,
    pub wallet: SessionToken,
    pub my_portal: SessionToken,
    pub bpd: SessionToken,
    pub zendesk: SessionToken,
    pub fims: SessionToken,
    pub session_tracking_id: String,
}

impl SessionTokens {
    /// Mint a complete independent token set
    pub fn generate() -> Self {
        Self {
            session: SessionToken::generate(),
            wallet: SessionToken::generate(),
            my_portal: SessionToken::generate(),
            bpd: SessionToken::generate(),
            zendesk: SessionToken::generate(),
            fims: SessionToken::generate(),
            session_tracking_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// The token of a given kind
    pub fn token(&self, kind: TokenKind) -> &SessionToken {
        match kind {
            TokenKind::Session => &self.session,
            TokenKind::Wallet => &self.wallet,
            TokenKind::MyPortal => &self.my_portal,
            TokenKind::Bpd => &self.bpd,
            TokenKind::Zendesk => &self.zendesk,
            TokenKind::Fims => &self.fims,
        }
    }
}
