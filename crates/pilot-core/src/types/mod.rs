//! Domain types shared by every layer.

pub mod ad;
pub mod game;
pub mod session;

pub use ad::{
    is_test_unit_id, AdHandle, AdLoadRequest, AdPolicy, AdRequestOptions, AdSurface, GeoLocation,
    Platform, RewardedCompletion, ShowOutcome, TEST_PUBLISHER_PREFIX,
};
pub use game::{GameCooldown, GameEligibility, GameStat, GameStats, LastGameTimes};
pub use session::{
    AuthPayload, DeviceTokenRequest, GoogleSignInRequest, LoginRequest, Session, UserRecord,
};

/// Theme chosen by the user, stored under `theme_preference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Dark theme
    Dark,
    /// Light theme
    Light,
}

impl ThemePreference {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Parse the stored representation; anything else means "unset"
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}
