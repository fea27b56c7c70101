//! Unified error type for the Earn Pilot core
//!
//! Each effect trait defines its own narrow error (`StorageError`,
//! `ApiError`, ...). `PilotError` is the single type that crosses crate
//! boundaries; the effect errors convert into it with `?`.

use crate::config::ConfigError;
use crate::effects::{AdSdkError, ApiError, IdentityError, StorageError, TimeError};
use serde::{Deserialize, Serialize};

/// Unified error type for all Earn Pilot operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PilotError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// The session is missing or was rejected by the backend
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the auth failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },

    /// The backend processed the request and refused it
    #[error("Rejected: {message}")]
    Rejected {
        /// HTTP status reported by the backend
        status: u16,
        /// Message returned by the backend (may be empty)
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Device storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Ad SDK failure
    #[error("Ad error: {message}")]
    Ad {
        /// Error message describing the ad failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl PilotError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a network timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the backend rejected the current session
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Standard Result type for Earn Pilot operations
pub type Result<T> = std::result::Result<T, PilotError>;

impl From<serde_json::Error> for PilotError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<StorageError> for PilotError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<TimeError> for PilotError {
    fn from(err: TimeError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ApiError> for PilotError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::unauthorized("session expired or invalid"),
            ApiError::Timeout { after_ms } => {
                Self::timeout(format!("network timeout after {after_ms}ms"))
            }
            ApiError::Transport { message } => Self::network(message),
            ApiError::Rejected { status, message } => Self::Rejected { status, message },
            ApiError::Decode { message } => Self::serialization(message),
        }
    }
}

impl From<AdSdkError> for PilotError {
    fn from(err: AdSdkError) -> Self {
        Self::Ad {
            message: err.to_string(),
        }
    }
}

impl From<IdentityError> for PilotError {
    fn from(err: IdentityError) -> Self {
        Self::network(err.to_string())
    }
}

impl From<ConfigError> for PilotError {
    fn from(err: ConfigError) -> Self {
        Self::invalid(err.to_string())
    }
}
