//! Tessera Types - Shared domain types
//!
//! This crate contains domain types used across the Tessera session core:
//! - Fiscal code identity and SPID assurance levels
//! - Opaque session tokens and the multi-token session record
//! - Lollipop key-binding types (assertion ref, login type)
//! - Audit events and the domain error taxonomy

pub mod error;
pub mod event;
pub mod fiscal_code;
pub mod lollipop;
pub mod session;
pub mod spid;
pub mod token;
pub mod user;

pub use error::*;
pub use event::*;
pub use fiscal_code::*;
pub use lollipop::*;
pub use session::*;
pub use spid::*;
pub use token::*;
pub use user::*;
