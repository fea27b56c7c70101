//! Scripted backend double

use async_trait::async_trait;
use parking_lot::Mutex;
use pilot_core::effects::{ApiError, BackendEffects};
use pilot_core::{
    AdPolicy, AuthPayload, DeviceTokenRequest, GameEligibility, GoogleSignInRequest, LoginRequest,
    Platform, RewardedCompletion, UserRecord,
};
use std::collections::HashMap;
use std::time::Duration;

/// Number of calls per endpoint, named after the [`BackendEffects`] method
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendCalls {
    pub fetch_ad_policy: usize,
    pub report_rewarded_completion: usize,
    pub check_game_eligibility: usize,
    pub login: usize,
    pub google_sign_in: usize,
    pub logout: usize,
    pub fetch_profile: usize,
    pub register_device_token: usize,
    pub deactivate_device_token: usize,
}

impl BackendCalls {
    /// Calls across every endpoint
    pub fn total(&self) -> usize {
        self.fetch_ad_policy
            + self.report_rewarded_completion
            + self.check_game_eligibility
            + self.login
            + self.google_sign_in
            + self.logout
            + self.fetch_profile
            + self.register_device_token
            + self.deactivate_device_token
    }
}

#[derive(Debug, Default)]
struct Inner {
    policy: AdPolicy,
    eligibility: HashMap<String, GameEligibility>,
    auth: Option<AuthPayload>,
    profile: Option<UserRecord>,
    offline: bool,
    reject_token: bool,
    google_delay: Option<Duration>,
    calls: BackendCalls,
    registered_tokens: Vec<String>,
    deactivated_tokens: Vec<String>,
    completions: Vec<RewardedCompletion>,
    last_bearer: Option<String>,
}

impl Inner {
    fn connectivity(&self) -> Result<(), ApiError> {
        if self.offline {
            return Err(ApiError::Transport {
                message: "network unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn authorize(&mut self, bearer: Option<&str>) -> Result<(), ApiError> {
        self.connectivity()?;
        self.last_bearer = bearer.map(str::to_string);
        if self.reject_token && bearer.is_some() {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    fn credentials(&self) -> Result<AuthPayload, ApiError> {
        self.connectivity()?;
        self.auth.clone().ok_or_else(|| ApiError::Rejected {
            status: 422,
            message: "Invalid credentials".to_string(),
        })
    }
}

/// In-memory [`BackendEffects`] with scripted responses
#[derive(Debug, Default)]
pub struct MockBackend {
    inner: Mutex<Inner>,
}

impl MockBackend {
    /// Backend serving the default (disabled) ad policy and no cooldowns
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy returned by `fetch_ad_policy`
    pub fn set_ad_policy(&self, policy: AdPolicy) {
        self.inner.lock().policy = policy;
    }

    /// Eligibility returned for `game_slug`; unknown games are playable
    pub fn set_eligibility(&self, game_slug: &str, eligibility: GameEligibility) {
        self.inner
            .lock()
            .eligibility
            .insert(game_slug.to_string(), eligibility);
    }

    /// Payload returned by both sign-in endpoints
    pub fn set_auth_payload(&self, token: &str, user: UserRecord) {
        let mut inner = self.inner.lock();
        inner.profile.get_or_insert_with(|| user.clone());
        inner.auth = Some(AuthPayload {
            token: token.to_string(),
            user,
        });
    }

    /// User returned by `fetch_profile`
    pub fn set_profile(&self, user: UserRecord) {
        self.inner.lock().profile = Some(user);
    }

    /// Fail every call with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Answer every authenticated call with 401
    pub fn set_reject_token(&self, reject: bool) {
        self.inner.lock().reject_token = reject;
    }

    /// Delay Google sign-in responses (uses tokio time)
    pub fn set_google_delay(&self, delay: Duration) {
        self.inner.lock().google_delay = Some(delay);
    }

    /// Call counters
    pub fn calls(&self) -> BackendCalls {
        self.inner.lock().calls.clone()
    }

    /// Push tokens registered so far
    pub fn registered_device_tokens(&self) -> Vec<String> {
        self.inner.lock().registered_tokens.clone()
    }

    /// Push tokens deactivated so far
    pub fn deactivated_device_tokens(&self) -> Vec<String> {
        self.inner.lock().deactivated_tokens.clone()
    }

    /// Rewarded completions reported so far
    pub fn rewarded_completions(&self) -> Vec<RewardedCompletion> {
        self.inner.lock().completions.clone()
    }

    /// Bearer token of the most recent authorised call
    pub fn last_bearer(&self) -> Option<String> {
        self.inner.lock().last_bearer.clone()
    }
}

#[async_trait]
impl BackendEffects for MockBackend {
    async fn fetch_ad_policy(
        &self,
        bearer: Option<&str>,
        _platform: Platform,
    ) -> Result<AdPolicy, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.fetch_ad_policy += 1;
        inner.authorize(bearer)?;
        Ok(inner.policy.clone())
    }

    async fn report_rewarded_completion(
        &self,
        bearer: &str,
        completion: &RewardedCompletion,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.report_rewarded_completion += 1;
        inner.authorize(Some(bearer))?;
        inner.completions.push(completion.clone());
        Ok(())
    }

    async fn check_game_eligibility(
        &self,
        bearer: Option<&str>,
        _game_id: u64,
        game_slug: &str,
    ) -> Result<GameEligibility, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.check_game_eligibility += 1;
        inner.authorize(bearer)?;
        Ok(inner
            .eligibility
            .get(game_slug)
            .copied()
            .unwrap_or(GameEligibility {
                can_play: true,
                remaining_seconds: 0,
            }))
    }

    async fn login(&self, _request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.login += 1;
        inner.credentials()
    }

    async fn google_sign_in(&self, _request: &GoogleSignInRequest) -> Result<AuthPayload, ApiError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.google_sign_in += 1;
            inner.google_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.lock().credentials()
    }

    async fn logout(&self, bearer: &str) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.logout += 1;
        inner.authorize(Some(bearer))
    }

    async fn fetch_profile(&self, bearer: &str) -> Result<UserRecord, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.fetch_profile += 1;
        inner.authorize(Some(bearer))?;
        inner.profile.clone().ok_or(ApiError::Rejected {
            status: 404,
            message: "User not found".to_string(),
        })
    }

    async fn register_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.register_device_token += 1;
        inner.authorize(Some(bearer))?;
        inner.registered_tokens.push(request.token.clone());
        Ok(())
    }

    async fn deactivate_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.deactivate_device_token += 1;
        inner.authorize(Some(bearer))?;
        inner.deactivated_tokens.push(request.token.clone());
        Ok(())
    }
}
