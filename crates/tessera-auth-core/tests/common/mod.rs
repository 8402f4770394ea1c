//! Shared test harness
#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;

use tessera_auth_core::{
    AuthConfig, AuthenticationLockManager, LollipopManager, LoginRequest, LoginService,
};
use tessera_types::{AssertionPayload, AssertionRef, FiscalCode, LoginType};

use mocks::{
    MockAuditBus, MockLockTable, MockLollipopApi, MockProfileApi, MockQueue, MockSessionStore,
    MockTelemetry,
};

pub const FISCAL_CODE: &str = "RSSCRL85T50H501V";
pub const ASSERTION_REF: &str = "sha256-6LvipIvFuhyorHpUqK3HjySC5Y6gshXHFBhU9EJ4DoM";
pub const OTHER_ASSERTION_REF: &str = "sha256-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const SALT: &str = "test-salt";

/// The full service wired onto in-memory mocks, with every mock exposed
pub struct Harness {
    pub service: LoginService<MockSessionStore, MockLockTable>,
    pub store: Arc<MockSessionStore>,
    pub lock_table: Arc<MockLockTable>,
    pub api: Arc<MockLollipopApi>,
    pub profiles: Arc<MockProfileApi>,
    pub queue: Arc<MockQueue>,
    pub audit: Arc<MockAuditBus>,
    pub telemetry: Arc<MockTelemetry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AuthConfig::new(SALT))
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MockSessionStore::new());
        let lock_table = Arc::new(MockLockTable::new());
        let api = Arc::new(MockLollipopApi::new());
        let profiles = Arc::new(MockProfileApi::new());
        let queue = Arc::new(MockQueue::new());
        let audit = Arc::new(MockAuditBus::new());
        let telemetry = Arc::new(MockTelemetry::new());

        let locks = AuthenticationLockManager::new(Arc::clone(&lock_table));
        let lollipop = LollipopManager::new(
            Arc::clone(&store),
            api.clone() as Arc<dyn tessera_auth_core::LollipopApi>,
            telemetry.clone() as Arc<dyn tessera_auth_core::TelemetrySink>,
            SALT,
        );
        let service = LoginService::new(
            config,
            Arc::clone(&store),
            locks,
            lollipop,
            profiles.clone() as Arc<dyn tessera_auth_core::ProfileApi>,
            queue.clone() as Arc<dyn tessera_auth_core::NotificationQueue>,
            audit.clone() as Arc<dyn tessera_auth_core::AuditBus>,
            telemetry.clone() as Arc<dyn tessera_auth_core::TelemetrySink>,
        );

        Self {
            service,
            store,
            lock_table,
            api,
            profiles,
            queue,
            audit,
            telemetry,
        }
    }
}

pub fn fiscal_code() -> FiscalCode {
    FiscalCode::parse(FISCAL_CODE).unwrap()
}

pub fn payload() -> AssertionPayload {
    AssertionPayload {
        fiscal_number: Some(FISCAL_CODE.into()),
        name: Some("Carla".into()),
        family_name: Some("Rossi".into()),
        date_of_birth: Some("1985-12-10".into()),
        spid_level: Some("L2".into()),
        issuer: "https://posteid.poste.it".into(),
        email: Some("carla.rossi@example.it".into()),
    }
}

pub fn legacy_request() -> LoginRequest {
    LoginRequest {
        payload: payload(),
        assertion: "<saml:Assertion/>".into(),
        assertion_ref: AssertionRef::parse(ASSERTION_REF).unwrap(),
        requested_login_type: LoginType::Legacy,
        current_user_hint: None,
        validation_cookie: None,
        follows_mismatch: false,
    }
}

pub fn lv_request() -> LoginRequest {
    LoginRequest {
        requested_login_type: LoginType::Lv,
        ..legacy_request()
    }
}
