//! Backend REST API effect.
//!
//! # Effect Classification
//!
//! - **Category**: Application Effect
//! - **Implementation**: `pilot-effects` (`HttpBackendHandler`), `pilot-testkit`
//!   (`MockBackend`)
//! - **Usage**: config fetch, reward reporting, game eligibility, auth flows
//!
//! Every authenticated call takes the bearer token explicitly; handlers add
//! it as `Authorization: Bearer <token>`. The session store is the only owner
//! of the token.

use crate::types::{
    AdPolicy, AuthPayload, DeviceTokenRequest, GameEligibility, GoogleSignInRequest, LoginRequest,
    Platform, RewardedCompletion, UserRecord,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Request could not be delivered or the response was cut off
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying message
        message: String,
    },
    /// No response within the allotted time
    #[error("Timed out after {after_ms}ms")]
    Timeout {
        /// Deadline that elapsed
        after_ms: u64,
    },
    /// The backend rejected the bearer token (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,
    /// The backend refused the request
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Message from the response envelope (may be empty)
        message: String,
    },
    /// Response body did not match the expected shape
    #[error("Decode error: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },
}

impl ApiError {
    /// Failure that did not reach the backend or never came back
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Standard response envelope: `{ success, message, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend accepted the request
    #[serde(default = "default_success")]
    pub success: bool,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Payload
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    /// Extract the payload, turning `success: false` or a missing payload
    /// into [`ApiError::Rejected`] / [`ApiError::Decode`].
    pub fn into_data(self, status: u16) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected {
                status,
                message: self.message.unwrap_or_default(),
            });
        }
        self.data.ok_or_else(|| ApiError::Decode {
            message: "response envelope has no data".to_string(),
        })
    }
}

/// Typed view of the backend REST API used by the client core.
#[async_trait]
pub trait BackendEffects: Send + Sync {
    /// `GET /api/admob/config?platform=`
    async fn fetch_ad_policy(
        &self,
        bearer: Option<&str>,
        platform: Platform,
    ) -> Result<AdPolicy, ApiError>;

    /// `POST /api/admob/rewarded-ad-completed`
    async fn report_rewarded_completion(
        &self,
        bearer: &str,
        completion: &RewardedCompletion,
    ) -> Result<(), ApiError>;

    /// `GET /api/games/{game_id}/can-play`
    async fn check_game_eligibility(
        &self,
        bearer: Option<&str>,
        game_id: u64,
        game_slug: &str,
    ) -> Result<GameEligibility, ApiError>;

    /// `POST /api/auth/login`
    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError>;

    /// `POST /api/auth/google-signin`
    async fn google_sign_in(&self, request: &GoogleSignInRequest) -> Result<AuthPayload, ApiError>;

    /// `POST /api/auth/logout`
    async fn logout(&self, bearer: &str) -> Result<(), ApiError>;

    /// `GET /api/profile`
    async fn fetch_profile(&self, bearer: &str) -> Result<UserRecord, ApiError>;

    /// `POST /api/device-tokens/register`
    async fn register_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError>;

    /// `POST /api/device-tokens/deactivate`
    async fn deactivate_device_token(
        &self,
        bearer: &str,
        request: &DeviceTokenRequest,
    ) -> Result<(), ApiError>;
}
