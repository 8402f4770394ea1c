//! Lollipop key-binding lifecycle
//!
//! A binding moves through reserve (done at the edge, before this crate is
//! reached), activate, rotate and revoke. Activation failure blocks login;
//! revocation is best-effort and reported through telemetry only, because a
//! stale remote key is harmless once the local binding pointer is gone.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use tessera_store::SessionStore;
use tessera_types::{
    AssertionRef, DomainError, DomainResult, FiscalCode, LollipopData, LoginType,
};

use crate::clients::LollipopApi;
use crate::telemetry::{hash_fiscal_code, TelemetryEvent, TelemetrySink};

/// Key-binding operations shared by the login pipeline and the session
/// teardown paths
pub struct LollipopManager<S: SessionStore> {
    store: Arc<S>,
    api: Arc<dyn LollipopApi>,
    telemetry: Arc<dyn TelemetrySink>,
    hash_salt: String,
}

impl<S: SessionStore> Clone for LollipopManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            api: Arc::clone(&self.api),
            telemetry: Arc::clone(&self.telemetry),
            hash_salt: self.hash_salt.clone(),
        }
    }
}

impl<S: SessionStore + 'static> LollipopManager<S> {
    pub fn new(
        store: Arc<S>,
        api: Arc<dyn LollipopApi>,
        telemetry: Arc<dyn TelemetrySink>,
        hash_salt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            api,
            telemetry,
            hash_salt: hash_salt.into(),
        }
    }

    /// Activate the reserved key at the remote authority.
    ///
    /// Must succeed before any session state is written: a session whose
    /// key was never activated cannot sign requests.
    pub async fn activate_key(
        &self,
        assertion_ref: &AssertionRef,
        fiscal_code: &FiscalCode,
        assertion: &str,
        binding_ttl: Duration,
    ) -> DomainResult<()> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(binding_ttl)
                .map_err(|e| DomainError::generic(format!("binding ttl out of range: {e}")))?;
        match self
            .api
            .activate(assertion_ref, fiscal_code, assertion, expires_at)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                self.telemetry.track(TelemetryEvent::LollipopActivationFailure {
                    assertion_ref: assertion_ref.clone(),
                    hashed_fiscal_code: hash_fiscal_code(fiscal_code, &self.hash_salt),
                    message: e.to_string(),
                });
                Err(DomainError::generic("error activating lollipop pub key"))
            }
        }
    }

    /// Store the binding pointer for the user, replacing any previous one
    pub async fn persist_binding(
        &self,
        fiscal_code: &FiscalCode,
        assertion_ref: &AssertionRef,
        login_type: LoginType,
        binding_ttl: Duration,
    ) -> DomainResult<()> {
        let data = LollipopData {
            assertion_ref: assertion_ref.clone(),
            login_type,
        };
        let ok = self
            .store
            .set_lollipop_data_for_user(fiscal_code, &data, binding_ttl)
            .await?;
        if ok {
            Ok(())
        } else {
            Err(DomainError::generic("error saving lollipop data"))
        }
    }

    /// Retire the user's previous binding at the start of a new login.
    ///
    /// The old key's revocation is detached so a slow or failing remote
    /// authority cannot delay the login; the local pointer delete is
    /// awaited because a surviving stale pointer would shadow the new
    /// binding. Returns whether a previous binding existed.
    pub async fn rotate(&self, fiscal_code: &FiscalCode) -> DomainResult<bool> {
        let previous = self.store.lollipop_assertion_ref_for_user(fiscal_code).await?;
        let existed = previous.is_some();
        if let Some(prev) = previous {
            self.spawn_revoke(prev, "rotation");
        }
        self.store.del_lollipop_data_for_user(fiscal_code).await?;
        Ok(existed)
    }

    /// Revoke the user's current key without touching the local pointer.
    /// Used by logout and the administrative lock, where the pointer
    /// delete happens separately.
    pub async fn revoke_detached(
        &self,
        fiscal_code: &FiscalCode,
        reason: &'static str,
    ) -> DomainResult<()> {
        if let Some(current) = self.store.lollipop_assertion_ref_for_user(fiscal_code).await? {
            self.spawn_revoke(current, reason);
        }
        Ok(())
    }

    /// Compensation path: undo a binding written earlier in a failed login.
    ///
    /// The remote revocation is awaited here but only telemetered on
    /// failure; the local delete is the part that must not fail silently.
    pub async fn delete_assertion_ref_association(
        &self,
        fiscal_code: &FiscalCode,
        assertion_ref: &AssertionRef,
        reason: &'static str,
    ) -> DomainResult<()> {
        tracing::info!(reason, assertion_ref = %assertion_ref, "deleting key binding");
        if let Err(e) = self.api.revoke(assertion_ref).await {
            self.telemetry.track(TelemetryEvent::KeyRevocationFailure {
                assertion_ref: assertion_ref.clone(),
                reason,
                message: e.to_string(),
            });
        }
        self.store.del_lollipop_data_for_user(fiscal_code).await?;
        Ok(())
    }

    fn spawn_revoke(&self, assertion_ref: AssertionRef, reason: &'static str) {
        let api = Arc::clone(&self.api);
        let telemetry = Arc::clone(&self.telemetry);
        tokio::spawn(async move {
            if let Err(e) = api.revoke(&assertion_ref).await {
                telemetry.track(TelemetryEvent::KeyRevocationFailure {
                    assertion_ref,
                    reason,
                    message: e.to_string(),
                });
            }
        });
    }
}
