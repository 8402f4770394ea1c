//! Tessera Store - Storage abstractions
//!
//! Repository traits for the session store and the durable lock table,
//! plus the Redis-backed session store implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_store::{RedisSessionStore, SessionStore};
//!
//! let store = RedisSessionStore::new("redis://localhost")?;
//! let active = store.has_active_session_or_lv(&fiscal_code).await?;
//! ```

pub mod redis;
pub mod repo;

pub use crate::redis::RedisSessionStore;
pub use repo::*;
