//! HTTP backend handler
//!
//! `reqwest`-based implementation of [`BackendEffects`] against the Earn
//! Pilot REST API. Response bodies use the `{ success, message, data }`
//! envelope; status handling is centralised in [`decode_response`].

use async_trait::async_trait;
use pilot_core::effects::{ApiEnvelope, ApiError, BackendEffects};
use pilot_core::{
    AdPolicy, AuthPayload, DeviceTokenRequest, GameEligibility, GoogleSignInRequest, LoginRequest,
    PilotConfig, Platform, RewardedCompletion, UserRecord,
};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("earn-pilot-core/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while building an [`HttpBackendHandler`]
#[derive(Debug, thiserror::Error)]
pub enum HttpBackendBuildError {
    /// Base URL is not an http(s) URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// Timeout outside 1..=300 seconds
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
    /// reqwest refused the client configuration
    #[error("Failed to create HTTP client: {0}")]
    ClientCreationFailed(String),
}

/// Builder for [`HttpBackendHandler`]
#[derive(Debug, Clone)]
pub struct HttpBackendHandlerBuilder {
    base_url: String,
    timeout_secs: u64,
    user_agent: Option<String>,
}

impl HttpBackendHandlerBuilder {
    /// Start from a base URL with the default 30 second timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
            user_agent: None,
        }
    }

    /// Per-request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Override the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the handler
    pub fn build(self) -> Result<HttpBackendHandler, HttpBackendBuildError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpBackendBuildError::InvalidBaseUrl(base_url));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(HttpBackendBuildError::InvalidTimeout(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        let timeout = Duration::from_secs(self.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()))
            .build()
            .map_err(|e| HttpBackendBuildError::ClientCreationFailed(e.to_string()))?;

        Ok(HttpBackendHandler {
            base_url,
            timeout,
            client,
        })
    }
}

/// Earn Pilot REST API over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackendHandler {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpBackendHandler {
    /// Builder for a handler rooted at `base_url`
    pub fn builder(base_url: impl Into<String>) -> HttpBackendHandlerBuilder {
        HttpBackendHandlerBuilder::new(base_url)
    }

    /// Handler configured from [`PilotConfig`]
    pub fn from_config(config: &PilotConfig) -> Result<Self, HttpBackendBuildError> {
        Self::builder(config.base_url())
            .timeout_secs(config.request_timeout_secs)
            .build()
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            ApiError::Transport {
                message: err.to_string(),
            }
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        debug!(status, bytes = body.len(), "backend response");
        decode_response(status, &body)
    }

    async fn execute_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        decode_ack(status, &body)
    }

    async fn post_json<B, T>(&self, path: &str, bearer: Option<&str>, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, path, bearer).json(body))
            .await
    }
}

fn envelope_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|env| env.message)
        .filter(|m| !m.trim().is_empty())
}

fn check_status(status: u16, body: &[u8]) -> Result<(), ApiError> {
    if status == 401 {
        return Err(ApiError::Unauthorized);
    }
    if !(200..300).contains(&status) {
        let message = envelope_message(body).unwrap_or_default();
        warn!(status, %message, "backend rejected request");
        return Err(ApiError::Rejected { status, message });
    }
    Ok(())
}

/// Decode a response body into the envelope payload.
///
/// - 401 → [`ApiError::Unauthorized`]
/// - other non-2xx → [`ApiError::Rejected`] with the envelope message
/// - 2xx with `success: false` → [`ApiError::Rejected`]
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
    check_status(status, body)?;
    let envelope: ApiEnvelope<T> =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode {
            message: e.to_string(),
        })?;
    envelope.into_data(status)
}

/// Decode a response that carries no payload
pub fn decode_ack(status: u16, body: &[u8]) -> Result<(), ApiError> {
    check_status(status, body)?;
    if body.is_empty() {
        return Ok(());
    }
    match serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body) {
        Ok(env) if !env.success => Err(ApiError::Rejected {
            status,
            message: env.message.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl BackendEffects for HttpBackendHandler {
    async fn fetch_ad_policy(
        &self,
        bearer: Option<&str>,
        platform: Platform,
    ) -> Result<AdPolicy, ApiError> {
        let builder = self
            .request(Method::GET, "/api/admob/config", bearer)
            .query(&[("platform", platform.as_str())]);
        self.execute(builder).await
    }

    async fn report_rewarded_completion(
        &self,
        bearer: &str,
        completion: &RewardedCompletion,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/api/admob/rewarded-ad-completed", Some(bearer))
            .json(completion);
        self.execute_unit(builder).await
    }

    async fn check_game_eligibility(
        &self,
        bearer: Option<&str>,
        game_id: u64,
        game_slug: &str,
    ) -> Result<GameEligibility, ApiError> {
        let builder = self
            .request(Method::GET, &format!("/api/games/{game_id}/can-play"), bearer)
            .query(&[("slug", game_slug)]);
        self.execute(builder).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        self.post_json("/api/auth/login", None, request).await
    }

    async fn google_sign_in(&self, request: &GoogleSignInRequest) -> Result<AuthPayload, ApiError> {
        self.post_json("/api/auth/google-signin", None, request)
            .await
    }

    async fn logout(&self, bearer: &str) -> Result<(), ApiError> {
        self.execute_unit(self.request(Method::POST, "/api/auth/logout", Some(bearer)))
            .await
    }

    async fn fetch_profile(&self, bearer: &str) -> Result<UserRecord, ApiError> {
        self.execute(self.request(Method::GET, "/api/profile", Some(bearer)))
            .await
    }

    async fn register_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/api/device-tokens/register", Some(bearer))
            .json(request);
        self.execute_unit(builder).await
    }

    async fn deactivate_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/api/device-tokens/deactivate", Some(bearer))
            .json(request);
        self.execute_unit(builder).await
    }
}
