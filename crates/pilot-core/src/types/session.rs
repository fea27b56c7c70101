//! Session and user records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as returned by the backend and cached in `user_data`.
///
/// Unknown fields are kept in `extra` so a cached record round-trips
/// unchanged through device storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Backend user id
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Account email
    #[serde(default)]
    pub email: String,
    /// Current point balance (informational; backend is authoritative)
    #[serde(default)]
    pub points: i64,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Any additional fields the backend sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Minimal record with only the required fields
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            points: 0,
            avatar: None,
            extra: Map::new(),
        }
    }
}

/// In-memory session state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    /// Bearer token
    pub token: Option<String>,
    /// Signed-in user
    pub user: Option<UserRecord>,
}

impl Session {
    /// Signed in only when both token and user are present
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Token + user pair produced by a successful sign in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    /// Bearer token
    pub token: String,
    /// Signed-in user
    pub user: UserRecord,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Body of `POST /api/auth/google-signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSignInRequest {
    /// ID token returned by the identity provider
    pub id_token: String,
}

/// Body of the device-token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTokenRequest {
    /// Push token
    pub token: String,
    /// Device platform
    pub platform: crate::types::Platform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{"id":9,"name":"Ana","email":"ana@example.com","points":120,"referral_code":"XYZ","level":3}"#;
        let user: UserRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(user.extra.get("referral_code"), Some(&Value::from("XYZ")));

        let encoded = serde_json::to_string(&user).unwrap();
        let decoded: UserRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn session_needs_token_and_user() {
        let mut session = Session {
            token: Some("t".to_string()),
            user: None,
        };
        assert!(!session.is_authenticated());
        session.user = Some(UserRecord::new(1, "a", "a@b.c"));
        assert!(session.is_authenticated());
        session.token = None;
        assert!(!session.is_authenticated());
    }
}
