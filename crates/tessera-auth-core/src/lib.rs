//! Tessera Auth Core - Authentication business logic
//!
//! Turns a successful federated-identity assertion into a live, revocable
//! application session and guards it against account takeover, underage
//! use, stale keys and administrative locks:
//! - `LoginService` — the ACS pipeline, one login attempt end to end
//! - `LollipopManager` — proof-of-possession key-binding lifecycle
//! - `AuthenticationLockManager` — durable lock/unlock for flagged users

pub mod clients;
pub mod config;
pub mod error;
pub mod lock;
pub mod lollipop;
pub mod login;
pub mod telemetry;

pub use clients::*;
pub use config::*;
pub use error::*;
pub use lock::*;
pub use lollipop::*;
pub use login::*;
pub use telemetry::*;
