//! Ad surfaces, the backend-provided ad policy and per-request options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every canonical AdMob sample ad unit.
pub const TEST_PUBLISHER_PREFIX: &str = "ca-app-pub-3940256099942544";

/// Host platform, used to pick canonical test unit ids and in config fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Android device
    #[default]
    Android,
    /// iOS device
    Ios,
}

impl Platform {
    /// Query-string value the backend expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// One of the four ad placements, each with an independent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdSurface {
    /// Inline banner rendered by the host view
    Banner,
    /// Full-screen ad between screens
    Interstitial,
    /// Opt-in video that grants bonus points
    Rewarded,
    /// Full-screen ad shown at app launch or right after sign in
    AppOpen,
}

impl AdSurface {
    /// All surfaces in a stable order
    pub const ALL: [AdSurface; 4] = [
        AdSurface::Banner,
        AdSurface::Interstitial,
        AdSurface::Rewarded,
        AdSurface::AppOpen,
    ];

    /// Canonical sample unit id for this surface on `platform`.
    pub fn test_unit_id(&self, platform: Platform) -> &'static str {
        match (platform, self) {
            (Platform::Android, Self::Banner) => "ca-app-pub-3940256099942544/6300978111",
            (Platform::Android, Self::Interstitial) => "ca-app-pub-3940256099942544/1033173712",
            (Platform::Android, Self::Rewarded) => "ca-app-pub-3940256099942544/5224354917",
            (Platform::Android, Self::AppOpen) => "ca-app-pub-3940256099942544/9257395921",
            (Platform::Ios, Self::Banner) => "ca-app-pub-3940256099942544/2934735716",
            (Platform::Ios, Self::Interstitial) => "ca-app-pub-3940256099942544/4411468910",
            (Platform::Ios, Self::Rewarded) => "ca-app-pub-3940256099942544/1712485313",
            (Platform::Ios, Self::AppOpen) => "ca-app-pub-3940256099942544/5575463023",
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Interstitial => "interstitial",
            Self::Rewarded => "rewarded",
            Self::AppOpen => "app_open",
        }
    }
}

impl fmt::Display for AdSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// True for empty ids and for the canonical sample ids.
pub fn is_test_unit_id(unit_id: &str) -> bool {
    let trimmed = unit_id.trim();
    trimmed.is_empty() || trimmed.starts_with(TEST_PUBLISHER_PREFIX)
}

/// Ad serving policy as delivered by `GET /api/admob/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdPolicy {
    /// Master switch for all surfaces
    pub is_enabled: bool,
    /// Serve sample units only
    pub test_mode: bool,
    /// Banner surface enabled
    pub show_banner: bool,
    /// Interstitial surface enabled
    pub show_interstitial: bool,
    /// Rewarded surface enabled
    pub show_rewarded: bool,
    /// App-open surface enabled
    pub show_app_open: bool,
    /// Show one interstitial every N requests
    pub interstitial_frequency: u32,
    /// Points granted per rewarded completion (informational, backend credits)
    pub rewarded_bonus_points: u32,
    /// Daily cap on rewarded completions
    pub max_rewarded_per_day: u32,
    /// Network the units belong to (e.g. "admob")
    pub ad_source: String,
    /// Configured banner unit id
    pub banner_ad_id: String,
    /// Configured interstitial unit id
    pub interstitial_ad_id: String,
    /// Configured rewarded unit id
    pub rewarded_ad_id: String,
    /// Configured app-open unit id
    pub app_open_ad_id: String,
}

impl Default for AdPolicy {
    fn default() -> Self {
        Self {
            is_enabled: false,
            test_mode: true,
            show_banner: false,
            show_interstitial: false,
            show_rewarded: false,
            show_app_open: false,
            interstitial_frequency: 1,
            rewarded_bonus_points: 0,
            max_rewarded_per_day: 0,
            ad_source: "admob".to_string(),
            banner_ad_id: String::new(),
            interstitial_ad_id: String::new(),
            rewarded_ad_id: String::new(),
            app_open_ad_id: String::new(),
        }
    }
}

impl AdPolicy {
    /// Whether `surface` may load and show under this policy.
    pub fn surface_enabled(&self, surface: AdSurface) -> bool {
        if !self.is_enabled {
            return false;
        }
        match surface {
            AdSurface::Banner => self.show_banner,
            AdSurface::Interstitial => self.show_interstitial,
            AdSurface::Rewarded => self.show_rewarded,
            AdSurface::AppOpen => self.show_app_open,
        }
    }

    /// Interstitial sampling period, never zero.
    pub fn effective_interstitial_frequency(&self) -> u32 {
        self.interstitial_frequency.max(1)
    }

    /// Unit id as configured by the backend, before test substitution.
    pub fn configured_unit_id(&self, surface: AdSurface) -> &str {
        match surface {
            AdSurface::Banner => &self.banner_ad_id,
            AdSurface::Interstitial => &self.interstitial_ad_id,
            AdSurface::Rewarded => &self.rewarded_ad_id,
            AdSurface::AppOpen => &self.app_open_ad_id,
        }
    }

    /// Unit id to request for `surface`.
    ///
    /// Sample ids are returned whenever test mode is on (from the policy or
    /// forced locally) or the configured id is empty or already a sample id.
    pub fn resolve_unit_id(&self, surface: AdSurface, platform: Platform, force_test: bool) -> String {
        let configured = self.configured_unit_id(surface);
        if self.test_mode || force_test || is_test_unit_id(configured) {
            surface.test_unit_id(platform).to_string()
        } else {
            configured.trim().to_string()
        }
    }
}

/// Fixed location attached to ad requests for targeting consistency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Accuracy radius in metres
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl GeoLocation {
    /// Coordinates lie within the valid WGS84 ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_m.map_or(true, |a| a >= 0.0)
    }
}

/// Options attached to every ad load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdRequestOptions {
    /// Location override, independent of device GPS
    pub location: Option<GeoLocation>,
    /// Request non-personalised ads only
    pub non_personalized: bool,
}

/// A single load request handed to the ad backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AdLoadRequest {
    /// Surface being loaded
    pub surface: AdSurface,
    /// Resolved unit id (already test-substituted)
    pub unit_id: String,
    /// Request options
    pub options: AdRequestOptions,
}

/// Opaque handle to a loaded ad instance owned by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdHandle(pub u64);

/// What happened while an ad was on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowOutcome {
    /// The user earned the reward (rewarded ads only)
    pub reward_earned: bool,
}

/// Body of `POST /api/admob/rewarded-ad-completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardedCompletion {
    /// Unit id that was shown
    pub ad_unit_id: String,
    /// Platform the ad was shown on
    pub platform: Platform,
    /// Whether the reward came from the simulated backend
    pub simulated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production_policy() -> AdPolicy {
        AdPolicy {
            is_enabled: true,
            test_mode: false,
            show_banner: true,
            show_interstitial: true,
            banner_ad_id: "ca-app-pub-1111111111111111/2222222222".to_string(),
            interstitial_ad_id: "ca-app-pub-1111111111111111/3333333333".to_string(),
            ..AdPolicy::default()
        }
    }

    #[test]
    fn test_mode_never_resolves_production_ids() {
        let policy = AdPolicy {
            test_mode: true,
            ..production_policy()
        };
        for platform in [Platform::Android, Platform::Ios] {
            for surface in AdSurface::ALL {
                let id = policy.resolve_unit_id(surface, platform, false);
                assert_eq!(id, surface.test_unit_id(platform));
            }
        }
    }

    #[test]
    fn empty_id_falls_back_to_sample() {
        let policy = production_policy();
        assert_eq!(
            policy.resolve_unit_id(AdSurface::Rewarded, Platform::Android, false),
            AdSurface::Rewarded.test_unit_id(Platform::Android)
        );
        assert_eq!(
            policy.resolve_unit_id(AdSurface::Banner, Platform::Android, false),
            "ca-app-pub-1111111111111111/2222222222"
        );
    }

    #[test]
    fn master_switch_disables_everything() {
        let policy = AdPolicy {
            is_enabled: false,
            ..production_policy()
        };
        assert!(AdSurface::ALL.iter().all(|s| !policy.surface_enabled(*s)));
    }

    #[test]
    fn policy_decodes_with_missing_fields() {
        let policy: AdPolicy =
            serde_json::from_str(r#"{"is_enabled":true,"show_rewarded":true,"max_rewarded_per_day":5}"#)
                .unwrap();
        assert!(policy.surface_enabled(AdSurface::Rewarded));
        assert_eq!(policy.max_rewarded_per_day, 5);
        assert_eq!(policy.effective_interstitial_frequency(), 1);
    }

    #[test]
    fn zero_frequency_is_treated_as_one() {
        let policy = AdPolicy {
            interstitial_frequency: 0,
            ..AdPolicy::default()
        };
        assert_eq!(policy.effective_interstitial_frequency(), 1);
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("iOS".parse::<Platform>(), Ok(Platform::Ios));
        assert!("windows".parse::<Platform>().is_err());
    }
}
