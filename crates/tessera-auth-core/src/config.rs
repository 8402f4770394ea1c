//! Configuration for the authentication core

use std::time::Duration;

use tessera_types::FiscalCode;

/// TTL pair governing one login type
#[derive(Debug, Clone, Copy)]
pub struct SessionTtls {
    /// Lifetime of the session record and its reverse entries
    pub session: Duration,
    /// Lifetime of the Lollipop key binding
    pub binding: Duration,
}

/// Per-user rollout switch for gated features
#[derive(Debug, Clone, Default)]
pub enum Rollout {
    /// Feature disabled for everyone
    #[default]
    None,
    /// Feature enabled for the listed fiscal codes only
    AllowList(Vec<FiscalCode>),
    /// Feature enabled for everyone
    All,
}

impl Rollout {
    pub fn includes(&self, fiscal_code: &FiscalCode) -> bool {
        match self {
            Self::None => false,
            Self::AllowList(list) => list.contains(fiscal_code),
            Self::All => true,
        }
    }
}

/// Authentication core configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// TTLs for the legacy multi-device session model
    pub standard_ttls: SessionTtls,
    /// TTLs for fast login: short session, long-lived key binding
    pub lv_ttls: SessionTtls,
    /// Minimum age to use the app
    pub min_app_age: u32,
    /// Issuer entity IDs of the CIE test environment
    pub cie_test_issuers: Vec<String>,
    /// Fiscal codes allowed to log in through the CIE test environment
    pub cie_test_allowed_users: Vec<FiscalCode>,
    /// Fast-login (LV) eligibility
    pub fast_login: Rollout,
    /// Enforcement of the key-binding validation cookie
    pub cookie_validation: Rollout,
    /// Salt for PII-safe fiscal code hashing in telemetry
    pub fiscal_code_hash_salt: String,
    /// Redirect base for LV-eligible clients (app-specific URI scheme)
    pub app_scheme_redirect: String,
    /// Redirect base for everyone else
    pub web_redirect: String,
}

impl AuthConfig {
    /// Create a config with production defaults
    pub fn new(fiscal_code_hash_salt: impl Into<String>) -> Self {
        Self {
            standard_ttls: SessionTtls {
                session: Duration::from_secs(30 * 24 * 60 * 60),
                binding: Duration::from_secs(30 * 24 * 60 * 60),
            },
            lv_ttls: SessionTtls {
                session: Duration::from_secs(15 * 60),
                binding: Duration::from_secs(2 * 365 * 24 * 60 * 60),
            },
            min_app_age: 14,
            cie_test_issuers: vec![
                "https://collaudo.idserver.servizicie.interno.gov.it/idp".to_string(),
            ],
            cie_test_allowed_users: Vec::new(),
            fast_login: Rollout::None,
            cookie_validation: Rollout::None,
            fiscal_code_hash_salt: fiscal_code_hash_salt.into(),
            app_scheme_redirect: "iologin://login".to_string(),
            web_redirect: "https://app.example.it/login/success".to_string(),
        }
    }

    /// The TTL pair for the given login type
    pub fn ttls_for(&self, login_type: tessera_types::LoginType) -> SessionTtls {
        match login_type {
            tessera_types::LoginType::Lv => self.lv_ttls,
            tessera_types::LoginType::Legacy => self.standard_ttls,
        }
    }

    pub fn with_fast_login(mut self, rollout: Rollout) -> Self {
        self.fast_login = rollout;
        self
    }

    pub fn with_cookie_validation(mut self, rollout: Rollout) -> Self {
        self.cookie_validation = rollout;
        self
    }

    pub fn with_min_app_age(mut self, age: u32) -> Self {
        self.min_app_age = age;
        self
    }

    pub fn with_cie_test_allowed_users(mut self, users: Vec<FiscalCode>) -> Self {
        self.cie_test_allowed_users = users;
        self
    }

    pub fn with_standard_ttls(mut self, ttls: SessionTtls) -> Self {
        self.standard_ttls = ttls;
        self
    }

    pub fn with_lv_ttls(mut self, ttls: SessionTtls) -> Self {
        self.lv_ttls = ttls;
        self
    }
}
