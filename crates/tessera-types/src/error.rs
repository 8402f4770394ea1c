//! Domain error taxonomy
//!
//! Every repository and service operation in the core returns one of these
//! six kinds instead of panicking or throwing. The orchestrator decides per
//! step whether a kind is terminal or best-effort.

use thiserror::Error;

/// Result alias used by all domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unexpected failure (I/O, remote call, timeout)
    #[error("error: {0}")]
    Generic(String),

    /// The named resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation is not supported by this deployment
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Stored or received data failed to decode
    #[error("format error: {0}")]
    Format(String),

    /// Caller is not allowed to perform the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The resource already exists or is in a conflicting state
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    /// Build a `Generic` error from anything displayable
    pub fn generic(msg: impl std::fmt::Display) -> Self {
        Self::Generic(msg.to_string())
    }

    /// Build a `Format` error from anything displayable
    pub fn format(msg: impl std::fmt::Display) -> Self {
        Self::Format(msg.to_string())
    }

    /// Stable code for API responses and telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generic(_) => "GENERIC",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Format(_) => "FORMAT_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
        }
    }
}
