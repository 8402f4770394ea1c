//! In-memory mocks for the storage and collaborator traits

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use tessera_auth_core::{
    ActivatedKey, AuditBus, LollipopApi, NewProfile, NotificationQueue, Profile, ProfileApi,
    TelemetryEvent, TelemetrySink,
};
use tessera_store::{AuthenticationLockRecord, LockTable, SessionStore, UnlockCode};
use tessera_types::{
    AssertionRef, DomainError, DomainResult, FiscalCode, LollipopData, LoginEvent,
    RejectedLoginEvent, SessionRecord, SessionToken, TokenKind, ValidatedUser,
};

/// In-memory session store
#[derive(Default, Clone)]
pub struct MockSessionStore {
    sessions: Arc<DashMap<String, SessionRecord>>,
    session_index: Arc<DashMap<String, Vec<SessionToken>>>,
    lollipop: Arc<DashMap<String, LollipopData>>,
    blocked: Arc<DashMap<String, ()>>,
    pub fail_set: Arc<AtomicBool>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn lollipop_for(&self, fiscal_code: &FiscalCode) -> Option<LollipopData> {
        self.lollipop
            .get(fiscal_code.as_str())
            .map(|r| r.value().clone())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn set(&self, record: &SessionRecord, _ttl: Duration) -> DomainResult<bool> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(DomainError::generic("session store is down"));
        }
        self.sessions
            .insert(record.session_token.as_str().to_string(), record.clone());
        Ok(true)
    }

    async fn get(
        &self,
        kind: TokenKind,
        token: &SessionToken,
    ) -> DomainResult<Option<SessionRecord>> {
        Ok(self
            .sessions
            .iter()
            .find(|r| r.value().token(kind) == token)
            .map(|r| r.value().clone()))
    }

    async fn delete_user(&self, record: &SessionRecord) -> DomainResult<bool> {
        if let Some(mut index) = self.session_index.get_mut(record.fiscal_code.as_str()) {
            index.retain(|t| t != &record.session_token);
        }
        Ok(self
            .sessions
            .remove(record.session_token.as_str())
            .is_some())
    }

    async fn add_session_info(
        &self,
        fiscal_code: &FiscalCode,
        token: &SessionToken,
        _ttl: Duration,
    ) -> DomainResult<bool> {
        self.session_index
            .entry(fiscal_code.as_str().to_string())
            .or_default()
            .push(token.clone());
        Ok(true)
    }

    async fn read_session_tokens(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<SessionToken>> {
        Ok(self
            .session_index
            .get(fiscal_code.as_str())
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Option<LollipopData>> {
        Ok(self.lollipop_for(fiscal_code))
    }

    async fn set_lollipop_data_for_user(
        &self,
        fiscal_code: &FiscalCode,
        data: &LollipopData,
        _ttl: Duration,
    ) -> DomainResult<bool> {
        self.lollipop
            .insert(fiscal_code.as_str().to_string(), data.clone());
        Ok(true)
    }

    async fn del_lollipop_data_for_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        Ok(self.lollipop.remove(fiscal_code.as_str()).is_some())
    }

    async fn set_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<()> {
        self.blocked.insert(fiscal_code.as_str().to_string(), ());
        Ok(())
    }

    async fn unset_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        Ok(self.blocked.remove(fiscal_code.as_str()).is_some())
    }

    async fn is_blocked_user(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        Ok(self.blocked.contains_key(fiscal_code.as_str()))
    }
}

/// In-memory durable lock table
#[derive(Default, Clone)]
pub struct MockLockTable {
    rows: Arc<DashMap<(String, String), AuthenticationLockRecord>>,
}

impl MockLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl LockTable for MockLockTable {
    async fn insert(&self, record: &AuthenticationLockRecord) -> DomainResult<()> {
        let key = (
            record.fiscal_code.as_str().to_string(),
            record.unlock_code.as_str().to_string(),
        );
        if self.rows.contains_key(&key) {
            return Err(DomainError::Conflict("lock row already exists".into()));
        }
        self.rows.insert(key, record.clone());
        Ok(())
    }

    async fn active_locks(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<AuthenticationLockRecord>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.key().0 == fiscal_code.as_str() && !r.value().released)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn release(
        &self,
        fiscal_code: &FiscalCode,
        unlock_codes: &[UnlockCode],
    ) -> DomainResult<()> {
        // All-or-nothing: verify every row first, flip only after
        for code in unlock_codes {
            let key = (
                fiscal_code.as_str().to_string(),
                code.as_str().to_string(),
            );
            if !self.rows.contains_key(&key) {
                return Err(DomainError::NotFound(format!(
                    "no lock row for code {code}"
                )));
            }
        }
        for code in unlock_codes {
            let key = (
                fiscal_code.as_str().to_string(),
                code.as_str().to_string(),
            );
            if let Some(mut row) = self.rows.get_mut(&key) {
                row.released = true;
            }
        }
        Ok(())
    }
}

/// Recording key authority
#[derive(Default)]
pub struct MockLollipopApi {
    pub activations: Mutex<Vec<AssertionRef>>,
    pub revocations: Mutex<Vec<AssertionRef>>,
    pub fail_activate: AtomicBool,
    pub fail_revoke: AtomicBool,
}

impl MockLollipopApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoked(&self) -> Vec<AssertionRef> {
        self.revocations.lock().unwrap().clone()
    }

    pub fn activated(&self) -> Vec<AssertionRef> {
        self.activations.lock().unwrap().clone()
    }
}

#[async_trait]
impl LollipopApi for MockLollipopApi {
    async fn activate(
        &self,
        assertion_ref: &AssertionRef,
        _fiscal_code: &FiscalCode,
        _assertion: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<ActivatedKey> {
        if self.fail_activate.load(Ordering::SeqCst) {
            return Err(DomainError::generic("key authority unavailable"));
        }
        self.activations.lock().unwrap().push(assertion_ref.clone());
        Ok(ActivatedKey {
            assertion_ref: assertion_ref.clone(),
            expires_at,
        })
    }

    async fn revoke(&self, assertion_ref: &AssertionRef) -> DomainResult<()> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(DomainError::generic("revocation failed"));
        }
        self.revocations.lock().unwrap().push(assertion_ref.clone());
        Ok(())
    }
}

/// In-memory profile service
#[derive(Default)]
pub struct MockProfileApi {
    profiles: DashMap<String, Profile>,
    pub fail_create: AtomicBool,
    pub create_conflict: AtomicBool,
}

impl MockProfileApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.profiles
            .insert(profile.fiscal_code.as_str().to_string(), profile);
    }

    pub fn has_profile(&self, fiscal_code: &FiscalCode) -> bool {
        self.profiles.contains_key(fiscal_code.as_str())
    }
}

#[async_trait]
impl ProfileApi for MockProfileApi {
    async fn get_profile(&self, fiscal_code: &FiscalCode) -> DomainResult<Option<Profile>> {
        Ok(self
            .profiles
            .get(fiscal_code.as_str())
            .map(|r| r.value().clone()))
    }

    async fn create_profile(&self, new_profile: &NewProfile) -> DomainResult<Profile> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DomainError::generic("profile service unavailable"));
        }
        if self.create_conflict.load(Ordering::SeqCst)
            || self.profiles.contains_key(new_profile.fiscal_code.as_str())
        {
            return Err(DomainError::Conflict("profile already exists".into()));
        }
        let profile = Profile {
            fiscal_code: new_profile.fiscal_code.clone(),
            email: new_profile.email.clone(),
        };
        self.insert_profile(profile.clone());
        Ok(profile)
    }
}

/// Recording notification queue
#[derive(Default)]
pub struct MockQueue {
    pub notified: Mutex<Vec<FiscalCode>>,
    pub deleted_installations: Mutex<Vec<FiscalCode>>,
    pub fail_notify: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationQueue for MockQueue {
    async fn notify_login(&self, user: &ValidatedUser) -> DomainResult<()> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(DomainError::generic("notification queue unavailable"));
        }
        self.notified.lock().unwrap().push(user.fiscal_code.clone());
        Ok(())
    }

    async fn delete_installation(&self, fiscal_code: &FiscalCode) -> DomainResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DomainError::generic("installation delete failed"));
        }
        self.deleted_installations
            .lock()
            .unwrap()
            .push(fiscal_code.clone());
        Ok(())
    }
}

/// Recording audit bus
#[derive(Default)]
pub struct MockAuditBus {
    pub logins: Mutex<Vec<LoginEvent>>,
    pub rejected: Mutex<Vec<RejectedLoginEvent>>,
    pub fail_rejected: AtomicBool,
}

impl MockAuditBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_events(&self) -> Vec<LoginEvent> {
        self.logins.lock().unwrap().clone()
    }

    pub fn rejected_events(&self) -> Vec<RejectedLoginEvent> {
        self.rejected.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditBus for MockAuditBus {
    async fn emit_login(&self, event: &LoginEvent) -> DomainResult<()> {
        self.logins.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn emit_rejected_login(&self, event: &RejectedLoginEvent) -> DomainResult<()> {
        if self.fail_rejected.load(Ordering::SeqCst) {
            return Err(DomainError::generic("audit bus unavailable"));
        }
        self.rejected.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Recording telemetry sink
#[derive(Default)]
pub struct MockTelemetry {
    pub events: Mutex<Vec<TelemetryEvent>>,
}

impl MockTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for MockTelemetry {
    fn track(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}
