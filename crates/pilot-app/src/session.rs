//! Session/auth store
//!
//! Single owner of the bearer token and the signed-in user record. The
//! session is persisted under `auth_token` / `user_data`; every write to
//! device storage is attempted before the in-memory state changes.

use parking_lot::RwLock;
use pilot_core::effects::{
    storage_keys, ApiError, BackendEffects, IdentityEffects, StorageEffects, StorageExt,
};
use pilot_core::{
    DeviceTokenRequest, GoogleSignInRequest, LoginRequest, PilotError, Platform, Result, Session,
    UserRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote cleanup step of [`SessionStore::logout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutStep {
    /// `POST /api/device-tokens/deactivate`
    DeviceToken,
    /// `POST /api/auth/logout`
    Backend,
    /// Third-party identity provider sign-out
    IdentityProvider,
    /// Removing the persisted session keys
    LocalStorage,
}

/// What went wrong during logout. Local state is cleared regardless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutReport {
    /// Steps that failed, in execution order
    pub failed: Vec<LogoutStep>,
}

impl LogoutReport {
    /// Every step succeeded (or had nothing to do)
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Holds the session and runs the sign-in and sign-out flows
pub struct SessionStore {
    storage: Arc<dyn StorageEffects>,
    backend: Arc<dyn BackendEffects>,
    identity: Arc<dyn IdentityEffects>,
    platform: Platform,
    sign_in_timeout: Duration,
    state: RwLock<Session>,
}

impl SessionStore {
    /// Store with an empty session; call [`bootstrap`](Self::bootstrap) to
    /// restore the persisted one.
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        backend: Arc<dyn BackendEffects>,
        identity: Arc<dyn IdentityEffects>,
        platform: Platform,
        sign_in_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            backend,
            identity,
            platform,
            sign_in_timeout,
            state: RwLock::new(Session::default()),
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    /// Token and user are both present
    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    /// Bearer token for authenticated calls
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Signed-in user
    pub fn user(&self) -> Option<UserRecord> {
        self.state.read().user.clone()
    }

    // ------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------

    /// Restore the session from device storage.
    ///
    /// Idempotent. A token without a user (or a user without a token) yields
    /// an unauthenticated session; an unreadable user record is removed
    /// together with its token.
    pub async fn bootstrap(&self) -> bool {
        let restored = self.read_persisted().await;
        let authenticated = restored.is_authenticated();
        *self.state.write() = restored;
        info!(authenticated, "session bootstrapped");
        authenticated
    }

    /// Restore the session and return the token, if authenticated.
    pub async fn restore_token(&self) -> Option<String> {
        if self.bootstrap().await {
            self.token()
        } else {
            None
        }
    }

    async fn read_persisted(&self) -> Session {
        let token = match self.storage.retrieve_str(storage_keys::AUTH_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored token");
                None
            }
        };
        let user = match self
            .storage
            .retrieve_json::<UserRecord>(storage_keys::USER_DATA)
            .await
        {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "stored user record unreadable, discarding session");
                self.remove_persisted().await;
                return Session::default();
            }
        };
        Session { token, user }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Persist and activate a session.
    ///
    /// Storage writes are attempted first; a write failure is logged and the
    /// session still becomes active for this process.
    pub async fn set_auth(&self, token: impl Into<String>, user: UserRecord) -> Result<()> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(PilotError::invalid("auth token must not be empty"));
        }

        if let Err(err) = self
            .storage
            .store_str(storage_keys::AUTH_TOKEN, &token)
            .await
        {
            warn!(error = %err, "failed to persist auth token");
        }
        if let Err(err) = self.storage.store_json(storage_keys::USER_DATA, &user).await {
            warn!(error = %err, "failed to persist user record");
        }

        let user_id = user.id;
        *self.state.write() = Session {
            token: Some(token),
            user: Some(user),
        };
        info!(user_id, "session set");
        Ok(())
    }

    /// Replace the user record of the active session
    pub async fn update_user(&self, user: UserRecord) -> Result<()> {
        if self.token().is_none() {
            return Err(PilotError::unauthorized("not signed in"));
        }
        self.storage
            .store_json(storage_keys::USER_DATA, &user)
            .await?;
        self.state.write().user = Some(user);
        Ok(())
    }

    /// Sign out.
    ///
    /// Remote cleanup runs first, each step guarded; the local session is
    /// cleared no matter which of them fail.
    pub async fn logout(&self) -> LogoutReport {
        let mut report = LogoutReport::default();

        if let Some(token) = self.token() {
            if let Some(push_token) = self.stored_push_token().await {
                let request = DeviceTokenRequest {
                    token: push_token,
                    platform: self.platform,
                };
                if let Err(err) = self.backend.deactivate_device_token(&token, &request).await {
                    warn!(error = %err, "device token deactivation failed");
                    report.failed.push(LogoutStep::DeviceToken);
                }
            }
            if let Err(err) = self.backend.logout(&token).await {
                warn!(error = %err, "backend logout failed");
                report.failed.push(LogoutStep::Backend);
            }
        }

        if let Err(err) = self.identity.sign_out().await {
            warn!(error = %err, "identity provider sign-out failed");
            report.failed.push(LogoutStep::IdentityProvider);
        }

        if !self.remove_persisted().await {
            report.failed.push(LogoutStep::LocalStorage);
        }
        *self.state.write() = Session::default();
        info!(failed_steps = report.failed.len(), "logged out");
        report
    }

    /// Local-only clear after the backend rejected the token.
    pub async fn clear_auth_for_401(&self) {
        self.remove_persisted().await;
        *self.state.write() = Session::default();
        info!("session cleared after 401");
    }

    /// Pass a backend result through, clearing the session on 401.
    pub async fn intercept<T>(&self, result: std::result::Result<T, ApiError>) -> Result<T> {
        match result {
            Err(ApiError::Unauthorized) => {
                self.clear_auth_for_401().await;
                Err(ApiError::Unauthorized.into())
            }
            other => other.map_err(PilotError::from),
        }
    }

    async fn remove_persisted(&self) -> bool {
        let mut ok = true;
        for key in [storage_keys::AUTH_TOKEN, storage_keys::USER_DATA] {
            if let Err(err) = self.storage.remove(key).await {
                warn!(key, error = %err, "failed to remove persisted session key");
                ok = false;
            }
        }
        ok
    }

    // ------------------------------------------------------------------
    // Sign-in workflows
    // ------------------------------------------------------------------

    /// Email/password sign-in
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(PilotError::invalid("email and password are required"));
        }
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let payload = self.backend.login(&request).await?;
        self.complete_sign_in(payload.token, payload.user).await
    }

    /// Exchange a Google ID token for a session.
    ///
    /// The backend call is bounded by the sign-in timeout; a hang surfaces as
    /// a network timeout.
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<UserRecord> {
        if id_token.trim().is_empty() {
            return Err(PilotError::invalid("missing Google ID token"));
        }
        let request = GoogleSignInRequest {
            id_token: id_token.to_string(),
        };
        let payload = tokio::time::timeout(
            self.sign_in_timeout,
            self.backend.google_sign_in(&request),
        )
        .await
        .map_err(|_| {
            warn!(
                timeout_secs = self.sign_in_timeout.as_secs(),
                "google sign-in timed out"
            );
            PilotError::timeout(format!(
                "network timeout after {}s",
                self.sign_in_timeout.as_secs()
            ))
        })??;
        self.complete_sign_in(payload.token, payload.user).await
    }

    async fn complete_sign_in(&self, token: String, user: UserRecord) -> Result<UserRecord> {
        self.set_auth(token, user.clone()).await?;
        self.register_push_token().await;
        Ok(user)
    }

    /// Re-fetch the signed-in user's profile and persist it
    pub async fn refresh_profile(&self) -> Result<UserRecord> {
        let token = self
            .token()
            .ok_or_else(|| PilotError::unauthorized("not signed in"))?;
        let user = self.intercept(self.backend.fetch_profile(&token).await).await?;
        self.update_user(user.clone()).await?;
        debug!(user_id = user.id, points = user.points, "profile refreshed");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Push token
    // ------------------------------------------------------------------

    /// Persist the device push token and register it when signed in
    pub async fn set_push_token(&self, push_token: &str) -> Result<()> {
        if push_token.trim().is_empty() {
            return Err(PilotError::invalid("push token must not be empty"));
        }
        self.storage
            .store_str(storage_keys::FCM_TOKEN, push_token)
            .await?;
        self.register_push_token().await;
        Ok(())
    }

    async fn stored_push_token(&self) -> Option<String> {
        match self.storage.retrieve_str(storage_keys::FCM_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read push token");
                None
            }
        }
    }

    async fn register_push_token(&self) {
        let Some(bearer) = self.token() else {
            return;
        };
        let Some(push_token) = self.stored_push_token().await else {
            return;
        };
        let request = DeviceTokenRequest {
            token: push_token,
            platform: self.platform,
        };
        let result = self.backend.register_device_token(&bearer, &request).await;
        if let Err(err) = self.intercept(result).await {
            warn!(error = %err, "push token registration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_effects::MemoryStorageHandler;
    use pilot_testkit::{MockBackend, MockIdentity};

    fn store_with(storage: MemoryStorageHandler, backend: Arc<MockBackend>) -> SessionStore {
        SessionStore::new(
            Arc::new(storage),
            backend,
            Arc::new(MockIdentity::new()),
            Platform::Android,
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn token_without_user_is_not_authenticated() {
        let storage = MemoryStorageHandler::new();
        storage
            .store(storage_keys::AUTH_TOKEN, b"tok".to_vec())
            .await
            .unwrap();
        let store = store_with(storage, Arc::new(MockBackend::new()));
        assert!(!store.bootstrap().await);
        assert_eq!(store.restore_token().await, None);
    }

    #[tokio::test]
    async fn corrupt_user_record_discards_session() {
        let storage = MemoryStorageHandler::new();
        storage
            .store(storage_keys::AUTH_TOKEN, b"tok".to_vec())
            .await
            .unwrap();
        storage
            .store(storage_keys::USER_DATA, b"{not json".to_vec())
            .await
            .unwrap();
        let store = store_with(storage.clone(), Arc::new(MockBackend::new()));
        assert!(!store.bootstrap().await);
        assert!(!storage.exists(storage_keys::AUTH_TOKEN).await.unwrap());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let store = store_with(MemoryStorageHandler::new(), Arc::new(MockBackend::new()));
        let err = store
            .set_auth("  ", UserRecord::new(1, "a", "a@b.c"))
            .await
            .unwrap_err();
        assert!(matches!(err, PilotError::Invalid { .. }));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn intercept_clears_session_on_401_only() {
        let storage = MemoryStorageHandler::new();
        let store = store_with(storage.clone(), Arc::new(MockBackend::new()));
        store
            .set_auth("tok", UserRecord::new(1, "a", "a@b.c"))
            .await
            .unwrap();

        let rejected: std::result::Result<(), ApiError> = Err(ApiError::Rejected {
            status: 422,
            message: "Invalid OTP".to_string(),
        });
        assert!(store.intercept(rejected).await.is_err());
        assert!(store.is_authenticated());

        let expired: std::result::Result<(), ApiError> = Err(ApiError::Unauthorized);
        let err = store.intercept(expired).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!store.is_authenticated());
        assert!(storage.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn push_token_registered_after_login() {
        let backend = Arc::new(MockBackend::new());
        backend.set_auth_payload("tok", UserRecord::new(3, "Kai", "kai@example.com"));
        let store = store_with(MemoryStorageHandler::new(), backend.clone());

        store.set_push_token("fcm-1").await.unwrap();
        assert_eq!(backend.calls().register_device_token, 0);

        store.login("kai@example.com", "pw").await.unwrap();
        assert_eq!(backend.calls().register_device_token, 1);
        assert_eq!(backend.registered_device_tokens(), vec!["fcm-1".to_string()]);
    }
}
