//! Categorized application errors
//!
//! Maps [`PilotError`] into the shape UI shells need:
//! - a category deciding the toast severity
//! - a user-facing message (backend messages verbatim, otherwise generic)
//! - whether the action may simply be retried

use pilot_core::PilotError;
use std::fmt;

/// Generic message used when the backend gave no usable text
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Toast severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToastLevel {
    /// Informational
    #[default]
    Info,
    /// Degraded but recoverable
    Warning,
    /// Action failed
    Error,
}

/// High-level error categories for frontend error handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Backend validation errors (invalid OTP, insufficient balance, ...)
    Validation,
    /// Session expired or invalid; the shell routes to sign in
    Auth,
    /// Connectivity errors (timeouts, unreachable host)
    Network,
    /// Everything else
    Operation,
}

impl ErrorCategory {
    /// Likely to resolve on retry
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Toast severity for this category
    #[must_use]
    pub fn toast_severity(&self) -> ToastLevel {
        match self {
            Self::Validation => ToastLevel::Info,
            Self::Auth => ToastLevel::Error,
            Self::Network => ToastLevel::Warning,
            Self::Operation => ToastLevel::Error,
        }
    }

    /// Short label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "Validation",
            Self::Auth => "Auth",
            Self::Network => "Network",
            Self::Operation => "Operation",
        }
    }

    /// Hint for the user on how to resolve this category of error.
    #[must_use]
    pub fn resolution_hint(&self) -> &'static str {
        match self {
            Self::Validation => "Check your input and try again",
            Self::Auth => "Please sign in again",
            Self::Network => "Check your network connection and retry",
            Self::Operation => "An unexpected error occurred",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Categorized application error
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppError {
    /// Network failure; always retryable
    Network { message: String, timed_out: bool },
    /// Session no longer valid
    Auth { context: String },
    /// Backend refused the request
    Validation { status: u16, message: String },
    /// Unexpected condition
    Internal { source: String, message: String },
}

impl AppError {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Operation,
        }
    }

    /// Toast severity for this error
    pub fn toast_level(&self) -> ToastLevel {
        self.category().toast_severity()
    }

    /// Whether the user can simply retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Validation { .. } => true,
            Self::Auth { .. } | Self::Internal { .. } => false,
        }
    }

    /// Short error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network {
                timed_out: true, ..
            } => "NET_TIMEOUT",
            Self::Network { .. } => "NET_ERROR",
            Self::Auth { .. } => "AUTH_EXPIRED",
            Self::Validation { .. } => "VALIDATION",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// Text to show in a toast or alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network {
                timed_out: true, ..
            } => "Network timeout. Please check your connection and try again.".to_string(),
            Self::Network { .. } => {
                "Unable to reach the server. Please check your connection.".to_string()
            }
            Self::Auth { .. } => "Your session has expired. Please sign in again.".to_string(),
            Self::Validation { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation { .. } | Self::Internal { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<PilotError> for AppError {
    fn from(err: PilotError) -> Self {
        match err {
            PilotError::Network { message, timed_out } => Self::Network { message, timed_out },
            PilotError::Unauthorized { message } => Self::Auth { context: message },
            PilotError::Rejected { status, message } => Self::Validation { status, message },
            PilotError::Invalid { message } => Self::Validation { status: 0, message },
            PilotError::Serialization { message } => Self::Internal {
                source: "decode".to_string(),
                message,
            },
            PilotError::Storage { message } => Self::Internal {
                source: "storage".to_string(),
                message,
            },
            PilotError::Ad { message } => Self::Internal {
                source: "ads".to_string(),
                message,
            },
            PilotError::Internal { message } => Self::Internal {
                source: "core".to_string(),
                message,
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { message, .. } => write!(f, "Network error: {message}"),
            Self::Auth { context } => write!(f, "Authentication failed: {context}"),
            Self::Validation { status, message } => {
                write!(f, "Request rejected ({status}): {message}")
            }
            Self::Internal { source, message } => write!(f, "{source}: {message}"),
        }
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_surfaced_verbatim() {
        let err = AppError::from(PilotError::Rejected {
            status: 422,
            message: "Insufficient balance".to_string(),
        });
        assert_eq!(err.user_message(), "Insufficient balance");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_recoverable());
    }

    #[test]
    fn empty_backend_message_falls_back_to_generic() {
        let err = AppError::from(PilotError::Rejected {
            status: 500,
            message: "  ".to_string(),
        });
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn timeout_is_a_retryable_warning() {
        let err = AppError::from(PilotError::timeout("network timeout after 30000ms"));
        assert_eq!(err.code(), "NET_TIMEOUT");
        assert!(err.is_recoverable());
        assert_eq!(err.toast_level(), ToastLevel::Warning);
        assert!(err.category().is_transient());
    }

    #[test]
    fn unauthorized_routes_to_sign_in() {
        let err = AppError::from(PilotError::unauthorized("expired"));
        assert_eq!(err.code(), "AUTH_EXPIRED");
        assert!(!err.is_recoverable());
        assert_eq!(err.toast_level(), ToastLevel::Error);
    }
}
