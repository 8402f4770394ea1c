//! Lollipop key-binding types
//!
//! An assertion ref is a hash-derived identifier of a client public key,
//! formatted as `<alg>-<base64url digest>`. At most one binding exists per
//! fiscal code at any time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Hash-derived public key identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssertionRef(String);

impl AssertionRef {
    /// Parse and validate an assertion ref.
    ///
    /// The digest part must be URL-safe base64 without padding and match the
    /// declared algorithm's output length.
    pub fn parse(s: &str) -> DomainResult<Self> {
        let (alg, digest_b64) = s
            .split_once('-')
            .ok_or_else(|| DomainError::format(format!("malformed assertion ref: {s}")))?;
        let expected_len = match alg {
            "sha256" => 32,
            "sha384" => 48,
            "sha512" => 64,
            other => {
                return Err(DomainError::format(format!(
                    "unsupported assertion ref algorithm: {other}"
                )))
            }
        };
        let digest = URL_SAFE_NO_PAD
            .decode(digest_b64)
            .map_err(|e| DomainError::format(format!("assertion ref digest: {e}")))?;
        if digest.len() != expected_len {
            return Err(DomainError::format(format!(
                "assertion ref digest length {} does not match {alg}",
                digest.len()
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The base64url digest part, i.e. the key thumbprint
    pub fn thumbprint(&self) -> &str {
        // Validated in parse(), the separator is always present
        self.0.split_once('-').map(|(_, d)| d).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssertionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which session model governs the login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoginType {
    /// Fast login: Lollipop TTL is the sole session-liveness signal
    #[serde(rename = "LV")]
    Lv,
    /// Multi-device session model tracked via the per-user session index
    #[serde(rename = "LEGACY")]
    Legacy,
}

/// Per-fiscal-code key binding stored under the user's key entry.
///
/// Pre-Lollipop records stored the bare assertion ref as a JSON string;
/// deserialization reinterprets those as `LEGACY` bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LollipopData {
    pub assertion_ref: AssertionRef,
    pub login_type: LoginType,
}

impl<'de> Deserialize<'de> for LollipopData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            #[serde(rename_all = "camelCase")]
            Full {
                assertion_ref: AssertionRef,
                login_type: LoginType,
            },
            Bare(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Full {
                assertion_ref,
                login_type,
            } => Ok(LollipopData {
                assertion_ref,
                login_type,
            }),
            Repr::Bare(s) => {
                let assertion_ref = AssertionRef::parse(&s).map_err(serde::de::Error::custom)?;
                Ok(LollipopData {
                    assertion_ref,
                    login_type: LoginType::Legacy,
                })
            }
        }
    }
}
