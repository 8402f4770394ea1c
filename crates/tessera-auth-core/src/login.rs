//! Login orchestration
//!
//! `LoginService` drives one login attempt end to end: decode the asserted
//! identity, run the fraud and policy gates, rotate the key binding, write
//! the session, reconcile the profile and publish the audit event. Policy
//! denials come back as `LoginOutcome::Rejected`; infrastructure failures
//! come back as `Err` after compensating any half-written binding.
//!
//! Every gate fires before the first token is minted, so a rejected login
//! leaves no trace in the session store.

use std::sync::Arc;

use chrono::Utc;

use tessera_store::{LockTable, SessionStore, UnlockCode};
use tessera_types::{
    AssertionPayload, AssertionRef, DomainError, DomainResult, FiscalCode, LoginEvent,
    LoginScenario, LoginType, RejectedLoginEvent, RejectionReason, SessionRecord, SessionTokens,
    ValidatedUser,
};

use crate::clients::{AuditBus, NewProfile, NotificationQueue, ProfileApi};
use crate::config::AuthConfig;
use crate::error::{LoginOutcome, LoginRejection, SessionState};
use crate::lock::AuthenticationLockManager;
use crate::lollipop::LollipopManager;
use crate::telemetry::{hash_fiscal_code, TelemetryEvent, TelemetrySink};

/// One login attempt as it arrives from the edge.
///
/// The SAML response has already been verified and flattened; the assertion
/// ref was reserved against the raw assertion before this point.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub payload: AssertionPayload,
    /// The raw signed assertion, forwarded to the key authority on activation
    pub assertion: String,
    pub assertion_ref: AssertionRef,
    pub requested_login_type: LoginType,
    /// Hashed fiscal code of the identity currently on the device, if any
    pub current_user_hint: Option<String>,
    /// Key-thumbprint cookie echoed back by the client
    pub validation_cookie: Option<String>,
    /// Set when this attempt immediately follows an identity-mismatch
    /// rejection on the same device
    pub follows_mismatch: bool,
}

/// The authentication core's public surface
pub struct LoginService<S: SessionStore, T: LockTable> {
    config: AuthConfig,
    store: Arc<S>,
    locks: AuthenticationLockManager<T>,
    lollipop: LollipopManager<S>,
    profiles: Arc<dyn ProfileApi>,
    queue: Arc<dyn NotificationQueue>,
    audit: Arc<dyn AuditBus>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<S: SessionStore + 'static, T: LockTable> LoginService<S, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AuthConfig,
        store: Arc<S>,
        locks: AuthenticationLockManager<T>,
        lollipop: LollipopManager<S>,
        profiles: Arc<dyn ProfileApi>,
        queue: Arc<dyn NotificationQueue>,
        audit: Arc<dyn AuditBus>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            store,
            locks,
            lollipop,
            profiles,
            queue,
            audit,
            telemetry,
        }
    }

    /// Run one login attempt.
    ///
    /// `Ok(Rejected(_))` is a policy denial and terminal for the attempt;
    /// `Err(_)` is an infrastructure failure the client may retry.
    pub async fn login(&self, request: LoginRequest) -> DomainResult<LoginOutcome> {
        let user = match ValidatedUser::try_from(&request.payload) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "assertion payload rejected");
                return Ok(LoginOutcome::Rejected(LoginRejection::InvalidAssertion(
                    e.to_string(),
                )));
            }
        };
        let fiscal_code = user.fiscal_code.clone();

        // Account-takeover gate: the asserted identity must match whoever
        // is already on the device.
        if let Some(hint) = &request.current_user_hint {
            let expected = hash_fiscal_code(&fiscal_code, &self.config.fiscal_code_hash_salt);
            if hint != &expected {
                self.emit_rejected(&fiscal_code, RejectionReason::CfMismatch)
                    .await;
                return Ok(LoginOutcome::Rejected(LoginRejection::FiscalCodeMismatch));
            }
        }

        if self.config.cie_test_issuers.contains(&request.payload.issuer)
            && !self.config.cie_test_allowed_users.contains(&fiscal_code)
        {
            tracing::warn!("login attempt through the CIE test environment");
            return Ok(LoginOutcome::Rejected(LoginRejection::CieTestNotAllowed));
        }

        if user.age_at(Utc::now().date_naive()) < self.config.min_app_age {
            self.emit_rejected(&fiscal_code, RejectionReason::AgeBlock)
                .await;
            return Ok(LoginOutcome::Rejected(LoginRejection::AgeBlock));
        }

        let fast_login_eligible = request.requested_login_type == LoginType::Lv
            && self.config.fast_login.includes(&fiscal_code);
        let login_type = if fast_login_eligible {
            LoginType::Lv
        } else {
            LoginType::Legacy
        };

        if self.store.is_blocked_user(&fiscal_code).await? {
            self.emit_rejected(&fiscal_code, RejectionReason::OngoingUserDeletion)
                .await;
            return Ok(LoginOutcome::Rejected(LoginRejection::BlockedUser));
        }

        // The lock gate applies to fast logins only, and the highest SPID
        // level overrides it: physical possession of the L3 credential
        // proves the holder is the account owner.
        if fast_login_eligible && !user.spid_level.is_highest() {
            if self.locks.is_locked(&fiscal_code).await? {
                self.emit_rejected(&fiscal_code, RejectionReason::AuthLock)
                    .await;
                return Ok(LoginOutcome::Rejected(LoginRejection::AuthenticationLocked));
            }
        }

        let ttls = self.config.ttls_for(login_type);

        // The previous key is retired before the cookie gate: a login that
        // fails cookie validation must not leave the old binding live.
        let had_previous_binding = self.lollipop.rotate(&fiscal_code).await?;

        if let Some(rejection) = self.check_validation_cookie(&request, &fiscal_code) {
            return Ok(LoginOutcome::Rejected(rejection));
        }

        let tokens = SessionTokens::generate();

        self.lollipop
            .activate_key(
                &request.assertion_ref,
                &fiscal_code,
                &request.assertion,
                ttls.binding,
            )
            .await?;
        // From here on any failure must tear the binding back down.
        if let Err(e) = self
            .lollipop
            .persist_binding(&fiscal_code, &request.assertion_ref, login_type, ttls.binding)
            .await
        {
            return Err(self
                .compensate_and_fail(&fiscal_code, &request.assertion_ref, e)
                .await);
        }

        let record = SessionRecord::new(&user, &tokens, Utc::now());
        let persist = async {
            let ok = self.store.set(&record, ttls.session).await?;
            if !ok {
                return Err(DomainError::generic("error while saving session"));
            }
            // Every session goes into the per-user index, LV included:
            // the administrative teardown walks the index, while LV
            // liveness still comes from the binding alone.
            self.store
                .add_session_info(&fiscal_code, &tokens.session, ttls.session)
                .await?;
            Ok(())
        };
        let (persist_res, profile_res) = tokio::join!(persist, self.fetch_or_create_profile(&user));

        let is_new_user = match persist_res.and(profile_res) {
            Ok(is_new) => is_new,
            Err(e) => {
                return Err(self
                    .compensate_and_fail(&fiscal_code, &request.assertion_ref, e)
                    .await);
            }
        };

        self.spawn_delete_installation(&fiscal_code);

        if let Err(e) = self.queue.notify_login(&user).await {
            return Err(self
                .compensate_and_fail(&fiscal_code, &request.assertion_ref, e)
                .await);
        }

        let scenario = if is_new_user {
            LoginScenario::NewUser
        } else if request.follows_mismatch {
            LoginScenario::ReloginAfterMismatch
        } else if had_previous_binding {
            LoginScenario::Relogin
        } else {
            LoginScenario::Standard
        };
        self.audit
            .emit_login(&LoginEvent {
                fiscal_code: fiscal_code.clone(),
                assertion_ref: Some(request.assertion_ref.clone()),
                login_type,
                scenario,
                ts: Utc::now(),
            })
            .await?;

        let base = if fast_login_eligible {
            &self.config.app_scheme_redirect
        } else {
            &self.config.web_redirect
        };
        tracing::info!(login_type = ?login_type, scenario = ?scenario, "login accepted");
        Ok(LoginOutcome::Redirect {
            url: format!("{base}#token={}", tokens.session),
        })
    }

    /// Tear down the session identified by the record.
    ///
    /// The key revocation is detached; the local binding and the session
    /// record are removed inline so a completed logout is immediately
    /// effective.
    pub async fn logout(&self, record: &SessionRecord) -> DomainResult<()> {
        self.lollipop
            .revoke_detached(&record.fiscal_code, "logout")
            .await?;
        self.store
            .del_lollipop_data_for_user(&record.fiscal_code)
            .await?;
        if self.store.delete_user(record).await? {
            tracing::info!("session destroyed");
            Ok(())
        } else {
            Err(DomainError::NotFound("no session to destroy".into()))
        }
    }

    /// Whether the user currently has any live session
    pub async fn session_state(&self, fiscal_code: &FiscalCode) -> DomainResult<SessionState> {
        let active = self.store.has_active_session_or_lv(fiscal_code).await?;
        Ok(SessionState { active })
    }

    /// Administrative lock: record the lock, then destroy every credential
    /// the user holds. The lock row goes first so a crash mid-teardown
    /// still leaves the account locked.
    pub async fn lock_authentication(
        &self,
        fiscal_code: &FiscalCode,
        unlock_code: &UnlockCode,
    ) -> DomainResult<()> {
        self.locks.lock(fiscal_code, unlock_code).await?;
        self.lollipop
            .revoke_detached(fiscal_code, "authentication lock")
            .await?;
        self.store.del_lollipop_data_for_user(fiscal_code).await?;
        let destroyed = self.store.delete_sessions_for_user(fiscal_code).await?;
        tracing::info!(destroyed, "authentication locked");
        Ok(())
    }

    /// Release the user's authentication locks.
    ///
    /// With a code, that code must belong to an active lock, proving the
    /// caller was the one who locked; without one, the caller has already
    /// authenticated at the highest level and every lock is released.
    /// In both cases all active locks go in one batch, and any deletion
    /// mark on the user is cleared.
    pub async fn unlock_authentication(
        &self,
        fiscal_code: &FiscalCode,
        unlock_code: Option<&UnlockCode>,
    ) -> DomainResult<()> {
        let active = self.locks.active_locks(fiscal_code).await?;
        if active.is_empty() {
            return Ok(());
        }
        if let Some(code) = unlock_code {
            if !active.iter().any(|lock| &lock.unlock_code == code) {
                return Err(DomainError::Unauthorized("unlock code is not valid".into()));
            }
        }
        let codes: Vec<UnlockCode> = active.into_iter().map(|lock| lock.unlock_code).collect();
        self.locks.unlock(fiscal_code, &codes).await?;
        self.store.unset_blocked_user(fiscal_code).await?;
        tracing::info!(released = codes.len(), "authentication unlocked");
        Ok(())
    }

    /// The user's active lock records
    pub async fn active_locks(
        &self,
        fiscal_code: &FiscalCode,
    ) -> DomainResult<Vec<tessera_store::AuthenticationLockRecord>> {
        self.locks.active_locks(fiscal_code).await
    }

    /// Compare the echoed cookie against the reserved key's thumbprint.
    ///
    /// A mismatch is always measured; it only rejects for users inside the
    /// enforcement rollout.
    fn check_validation_cookie(
        &self,
        request: &LoginRequest,
        fiscal_code: &FiscalCode,
    ) -> Option<LoginRejection> {
        let expected = request.assertion_ref.thumbprint();
        let matches = request.validation_cookie.as_deref() == Some(expected);
        if matches {
            return None;
        }
        let enforced = self.config.cookie_validation.includes(fiscal_code);
        self.telemetry.track(TelemetryEvent::CookieValidationMismatch {
            hashed_fiscal_code: hash_fiscal_code(fiscal_code, &self.config.fiscal_code_hash_salt),
            cookie_present: request.validation_cookie.is_some(),
            enforced,
        });
        enforced.then_some(LoginRejection::CookieMismatch)
    }

    /// `Ok(true)` when a profile was created for a first-time user.
    /// A creation conflict means a concurrent first login won the race and
    /// counts as an existing profile.
    async fn fetch_or_create_profile(&self, user: &ValidatedUser) -> DomainResult<bool> {
        if self.profiles.get_profile(&user.fiscal_code).await?.is_some() {
            return Ok(false);
        }
        let new_profile = NewProfile {
            fiscal_code: user.fiscal_code.clone(),
            email: user.spid_email.clone(),
        };
        match self.profiles.create_profile(&new_profile).await {
            Ok(_) => Ok(true),
            Err(DomainError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Undo the binding written earlier in this attempt, then surface the
    /// original failure. A failing teardown takes precedence: the caller
    /// must know the binding may still be live.
    async fn compensate_and_fail(
        &self,
        fiscal_code: &FiscalCode,
        assertion_ref: &AssertionRef,
        original: DomainError,
    ) -> DomainError {
        tracing::error!(error = %original, "login failed after key activation, compensating");
        match self
            .lollipop
            .delete_assertion_ref_association(fiscal_code, assertion_ref, "login compensation")
            .await
        {
            Ok(()) => original,
            Err(teardown) => teardown,
        }
    }

    /// Best-effort rejected-login audit. Emission failure is downgraded to
    /// telemetry so the denial itself is never masked.
    async fn emit_rejected(&self, fiscal_code: &FiscalCode, reason: RejectionReason) {
        let event = RejectedLoginEvent {
            fiscal_code: fiscal_code.clone(),
            reason,
            ts: Utc::now(),
        };
        if let Err(e) = self.audit.emit_rejected_login(&event).await {
            self.telemetry.track(TelemetryEvent::RejectedLoginEmitFailure {
                event,
                message: e.to_string(),
            });
        }
    }

    fn spawn_delete_installation(&self, fiscal_code: &FiscalCode) {
        let queue = Arc::clone(&self.queue);
        let telemetry = Arc::clone(&self.telemetry);
        let hashed = hash_fiscal_code(fiscal_code, &self.config.fiscal_code_hash_salt);
        let fiscal_code = fiscal_code.clone();
        tokio::spawn(async move {
            if let Err(e) = queue.delete_installation(&fiscal_code).await {
                telemetry.track(TelemetryEvent::InstallationDeleteFailure {
                    hashed_fiscal_code: hashed,
                    message: e.to_string(),
                });
            }
        });
    }
}
