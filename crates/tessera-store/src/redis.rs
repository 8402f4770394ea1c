//! Redis session store
//!
//! Key layout:
//! - `SESSION-<token>` — canonical session record (JSON)
//! - `WALLET-/MYPORTAL-/BPD-/ZENDESK-/FIMS-<token>` — reverse entries
//!   holding the primary session token
//! - `USERSESSIONS-<cf>` — legacy session index (SET of session tokens)
//! - `KEYS-<cf>` — Lollipop key binding (JSON, or a bare assertion ref for
//!   pre-Lollipop records)
//! - `blockedUserSet` — fiscal codes undergoing account deletion (SET)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

use tessera_types::{
    AssertionRef, DomainError, DomainResult, FiscalCode, LollipopData, LoginType, SessionRecord,
    SessionToken, TokenKind,
};

use crate::repo::SessionStore;

const SESSION_PREFIX: &str = "SESSION-";
const WALLET_PREFIX: &str = "WALLET-";
const MYPORTAL_PREFIX: &str = "MYPORTAL-";
const BPD_PREFIX: &str = "BPD-";
const ZENDESK_PREFIX: &str = "ZENDESK-";
const FIMS_PREFIX: &str = "FIMS-";
const LOLLIPOP_PREFIX: &str = "KEYS-";
const USER_SESSIONS_PREFIX: &str = "USERSESSIONS-";
const BLOCKED_USERS_KEY: &str = "blockedUserSet";

/// Redis-backed session store.
///
/// The client is a long-lived singleton; a multiplexed connection is
/// obtained per operation and shares the underlying socket.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    /// Create a store from a Redis URL
    pub fn new(redis_url: &str) -> DomainResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| DomainError::generic(format!("redis connect: {e}")))?;
        Ok(Self { client })
    }

    async fn conn(&self) -> DomainResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(redis_err)
    }

    fn token_key(kind: TokenKind, token: &SessionToken) -> String {
        let prefix = match kind {
            TokenKind::Session => SESSION_PREFIX,
            TokenKind::Wallet => WALLET_PREFIX,
            TokenKind::MyPortal => MYPORTAL_PREFIX,
            TokenKind::Bpd => BPD_PREFIX,
            TokenKind::Zendesk => ZENDESK_PREFIX,
            TokenKind::Fims => FIMS_PREFIX,
        };
        format!("{prefix}{token}")
    }

    fn lollipop_key(fiscal_code: &FiscalCode) -> String {
        format!("{LOLLIPOP_PREFIX}{fiscal_code}")
    }

    fn user_sessions_key(fiscal_code: &FiscalCode) -> String {
        format!("{USER_SESSIONS_PREFIX}{fiscal_code}")
    }

    /// SET with EX, reporting whether the server acknowledged with `OK`
    async fn set_with_ttl(
        &self,
        conn: &mut MultiplexedConnection,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> DomainResult<bool> {
        let reply: String = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(conn)
            .await
            .map_err(redis_err)?;
        Ok(reply == "OK")
    }
}

fn redis_err(e: redis::RedisError) -> DomainError {
    DomainError::generic(format!("redis: {e}"))
}

/// Decode a stored key binding, applying the legacy migration shim: a bare
/// assertion ref (pre-Lollipop record) is reinterpreted as a `LEGACY`
/// binding.
pub(crate) fn decode_lollipop_data(raw: &str) -> DomainResult<LollipopData> {
    if let Ok(data) = serde_json::from_str::<LollipopData>(raw) {
        return Ok(data);
    }
    let assertion_ref = AssertionRef::parse(raw)
        .map_err(|_| DomainError::format(format!("undecodable lollipop data: {raw}")))?;
    Ok(LollipopData {
        assertion_ref,
        login_type: LoginType::Legacy,
    })
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, record: &SessionRecord, ttl: Duration) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(record)
            .map_err(|e| DomainError::format(format!("session record: {e}")))?;

        // Canonical record first, then the reverse entries; a bad reply on
        // any write makes the whole set a retryable failure.
        let session_key = Self::token_key(TokenKind::Session, &record.session_token);
        let mut all_ok = self.set_with_ttl(&mut conn, &session_key, &payload, ttl).await?;

        for kind in TokenKind::ALL {
            if kind == TokenKind::Session {
                continue;
            }
            let key = Self::token_key(kind, record.token(kind));
            let ok = self
                .set_with_ttl(&mut conn, &key, record.session_token.as_str(), ttl)
                .await?;
            all_ok = all_ok && ok;
        }
        Ok(all_ok)
    }

    async fn get(
        &self,
        kind: TokenKind,
        token: &SessionToken,
    ) -> DomainResult<Option<SessionRecord>> {
        let mut conn = self.conn().await?;
        let session_token = if kind == TokenKind::Session {
            token.clone()
        } else {
            let pointer: Option<String> = conn
                .get(Self::token_key(kind, token))
                .await
                .map_err(redis_err)?;
            match pointer {
                Some(t) => SessionToken::from_string(t),
                None => return Ok(None),
            }
        };

        let raw: Option<String> = conn
            .get(Self::token_key(TokenKind::Session, &session_token))
            .await
            .map_err(redis_err)?;
        match raw {
            Some(json) => {
                let record: SessionRecord = serde_json::from_str(&json)
                    .map_err(|e| DomainError::format(format!("session record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, record: &SessionRecord) -> DomainResult<bool> {
        let mut conn = self.conn().await?;

        for kind in TokenKind::ALL {
            if kind == TokenKind::Session {
                continue;
            }
            let _: i64 = conn
                .del(Self::token_key(kind, record.token(kind)))
                .await
                .map_err(redis_err)?;
        }

        // Index membership is meaningless once the record is gone
        let removed_member: i64 = conn
            .srem(
                Self::user_sessions_key(&record.fiscal_code),
                record.session_token.as_str(),
            )
            .await
            .map_err(redis_err)?;
        if removed_member == 0 {
            tracing::debug!(
                fiscal_code = %record.fiscal_code,
                "session was not a member of the legacy index"
            );
        }

        let deleted: i64 = conn
            .del(Self::token_key(TokenKind::Session, &record.session_token))
            .await
            .map_err(redis_err)?;
        Ok(deleted > 0)
    }

    async fn add_session_info(
        &self,
        fiscal_code: &FiscalCode,
        token: &SessionToken,
        ttl: Duration,
    ) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        let key = Self::user_sessions_key(fiscal_code);
        let _: i64 = conn
            .sadd(&key, token.as_str())
            .await
            .map_err(redis_err)?;
        let _: bool = conn
            .expire(&key, ttl.as_secs().max(1) as i64)
            .await
            .map_err(redis_err)?;
        Ok(true)
    }

    async fn read_session_tokens(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<SessionToken>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .smembers(Self::user_sessions_key(fiscal_code))
            .await
            .map_err(redis_err)?;
        Ok(members.into_iter().map(SessionToken::from_string).collect())
    }

    async fn lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Option<LollipopData>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(Self::lollipop_key(fiscal_code))
            .await
            .map_err(redis_err)?;
        raw.map(|r| decode_lollipop_data(&r)).transpose()
    }

    async fn set_lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
        data: &LollipopData,
        ttl: Duration,
    ) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(data)
            .map_err(|e| DomainError::format(format!("lollipop data: {e}")))?;
        self.set_with_ttl(&mut conn, &Self::lollipop_key(fiscal_code), &payload, ttl)
            .await
    }

    async fn del_lollipop_data_for_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn
            .del(Self::lollipop_key(fiscal_code))
            .await
            .map_err(redis_err)?;
        Ok(deleted > 0)
    }

    async fn set_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn
            .sadd(BLOCKED_USERS_KEY, fiscal_code.as_str())
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn unset_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn
            .srem(BLOCKED_USERS_KEY, fiscal_code.as_str())
            .await
            .map_err(redis_err)?;
        Ok(removed > 0)
    }

    async fn is_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        let mut conn = self.conn().await?;
        conn.sismember(BLOCKED_USERS_KEY, fiscal_code.as_str())
            .await
            .map_err(redis_err)
    }
}
