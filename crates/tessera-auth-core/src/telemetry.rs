//! Telemetry sink and PII-safe hashing
//!
//! Best-effort failures (key revocation, audit emission, cookie rollout
//! measurements) are reported here instead of failing the login path.
//! Events never carry a raw fiscal code; they carry its salted hash.

use sha2::{Digest, Sha256};

use tessera_types::{AssertionRef, FiscalCode, RejectedLoginEvent};

/// Telemetry events emitted by the core
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// The remote key authority refused or failed an activation
    LollipopActivationFailure {
        assertion_ref: AssertionRef,
        hashed_fiscal_code: String,
        message: String,
    },
    /// A best-effort key revocation did not go through
    KeyRevocationFailure {
        assertion_ref: AssertionRef,
        /// Why the key was being torn down (rotation, logout, lock, ...)
        reason: &'static str,
        message: String,
    },
    /// A rejected-login audit event could not be published
    RejectedLoginEmitFailure {
        event: RejectedLoginEvent,
        message: String,
    },
    /// The validation cookie was absent or did not match the key thumbprint.
    /// Tracked even when enforcement is off, to measure rollout risk.
    CookieValidationMismatch {
        hashed_fiscal_code: String,
        cookie_present: bool,
        enforced: bool,
    },
    /// The fire-and-forget installation cleanup failed
    InstallationDeleteFailure {
        hashed_fiscal_code: String,
        message: String,
    },
}

/// Destination for telemetry events
pub trait TelemetrySink: Send + Sync {
    fn track(&self, event: TelemetryEvent);
}

/// Default sink that forwards events to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn track(&self, event: TelemetryEvent) {
        tracing::info!(event = ?event, "telemetry");
    }
}

/// Salted SHA-256 of a fiscal code, hex-encoded
pub fn hash_fiscal_code(fiscal_code: &FiscalCode, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(fiscal_code.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
