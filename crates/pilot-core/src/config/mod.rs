//! Client configuration
//!
//! `PilotConfig` is assembled in layers: defaults, then an optional TOML
//! file, then `EARN_PILOT_*` environment overrides, then validation. The API
//! base URL is always injected here; nothing rewrites hosts at runtime.

pub mod validation;

pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use crate::types::{GeoLocation, Platform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "EARN_PILOT_";

/// Configuration loading failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {reason}")]
    Read {
        /// File path
        path: String,
        /// Underlying reason
        reason: String,
    },
    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {reason}")]
    Parse {
        /// Parser message
        reason: String,
    },
    /// An environment override could not be applied
    #[error("Invalid value for {key}: {reason}")]
    Env {
        /// Variable name
        key: String,
        /// Why it was rejected
        reason: String,
    },
    /// Validation failed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Layered configuration behaviour shared by config types.
pub trait LayeredConfig: Sized + Default {
    /// Load from a TOML file, missing fields take defaults
    fn load_from_file(path: &Path) -> Result<Self, ConfigError>;

    /// Apply overrides from `(key, value)` pairs (already prefix-filtered or not)
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Apply overrides from the process environment
    fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Validate the assembled configuration
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Earn Pilot client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Backend base URL, e.g. `https://api.earnpilot.app`
    pub api_base_url: String,
    /// Host platform
    pub platform: Platform,
    /// Timeout for ordinary backend calls
    pub request_timeout_secs: u64,
    /// Timeout for the Google sign-in exchange
    pub sign_in_timeout_secs: u64,
    /// How long a cooldown observation is trusted
    pub cooldown_fresh_window_secs: u64,
    /// Backoff before retrying a failed app-open load
    pub app_open_retry_delay_ms: u64,
    /// Delay before granting a reward with the simulated ad backend
    pub simulated_reward_delay_ms: u64,
    /// Daily rewarded cap used until a policy is fetched
    pub default_max_rewarded_per_day: u32,
    /// Offset used to decide when the rewarded quota day rolls over
    pub quota_utc_offset_minutes: i32,
    /// Always request sample ad units (development builds)
    pub force_test_ads: bool,
    /// Fixed location attached to ad requests
    pub ad_location: Option<GeoLocation>,
    /// Directory for the filesystem storage handler
    pub storage_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            platform: Platform::Android,
            request_timeout_secs: 30,
            sign_in_timeout_secs: 30,
            cooldown_fresh_window_secs: 10,
            app_open_retry_delay_ms: 10_000,
            simulated_reward_delay_ms: 3_000,
            default_max_rewarded_per_day: 10,
            quota_utc_offset_minutes: 0,
            force_test_ads: false,
            ad_location: None,
            storage_dir: PathBuf::from(".earn-pilot"),
            log_filter: "info".to_string(),
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Env {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

impl PilotConfig {
    /// Defaults, then `path` if given, then the environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        tracing::debug!(
            file = ?path,
            api_base_url = %config.api_base_url,
            platform = ?config.platform,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse from a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

impl LayeredConfig for PilotConfig {
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut latitude = None;
        let mut longitude = None;

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "API_BASE_URL" => self.api_base_url = value.trim().to_string(),
                "PLATFORM" => {
                    self.platform = value.parse().map_err(|reason| ConfigError::Env {
                        key: key.clone(),
                        reason,
                    })?;
                }
                "REQUEST_TIMEOUT_SECS" => self.request_timeout_secs = parse_env(&key, &value)?,
                "SIGN_IN_TIMEOUT_SECS" => self.sign_in_timeout_secs = parse_env(&key, &value)?,
                "FORCE_TEST_ADS" => self.force_test_ads = parse_env(&key, &value)?,
                "STORAGE_DIR" => self.storage_dir = PathBuf::from(value),
                "LOG_FILTER" => self.log_filter = value,
                "AD_LATITUDE" => latitude = Some(parse_env::<f64>(&key, &value)?),
                "AD_LONGITUDE" => longitude = Some(parse_env::<f64>(&key, &value)?),
                _ => {}
            }
        }

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                self.ad_location = Some(GeoLocation {
                    latitude,
                    longitude,
                    accuracy_m: self.ad_location.and_then(|l| l.accuracy_m),
                });
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Env {
                    key: format!("{ENV_PREFIX}AD_LATITUDE/{ENV_PREFIX}AD_LONGITUDE"),
                    reason: "both coordinates must be set together".to_string(),
                })
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut v = ConfigValidator::new();
        v.http_url("api_base_url", &self.api_base_url)
            .range("request_timeout_secs", self.request_timeout_secs as f64, Some(1.0), Some(300.0))
            .range("sign_in_timeout_secs", self.sign_in_timeout_secs as f64, Some(1.0), Some(300.0))
            .range(
                "cooldown_fresh_window_secs",
                self.cooldown_fresh_window_secs as f64,
                Some(1.0),
                Some(3600.0),
            )
            .range(
                "quota_utc_offset_minutes",
                self.quota_utc_offset_minutes,
                Some(-14 * 60),
                Some(14 * 60),
            )
            .custom(
                "ad_location",
                &self.ad_location,
                |loc| loc.map_or(true, |l| l.is_valid()),
                "coordinates out of range",
            );
        v.result().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_validate() {
        assert!(PilotConfig::default().validate().is_ok());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_base_url = "https://api.earnpilot.app/"
platform = "ios"
force_test_ads = true

[ad_location]
latitude = 23.81
longitude = 90.41
"#
        )
        .unwrap();

        let config = PilotConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.base_url(), "https://api.earnpilot.app");
        assert_eq!(config.platform, Platform::Ios);
        assert!(config.force_test_ads);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.ad_location.map(|l| l.latitude), Some(23.81));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = PilotConfig::default();
        config
            .merge_with_vars(vars(&[
                ("EARN_PILOT_API_BASE_URL", "https://staging.earnpilot.app"),
                ("EARN_PILOT_PLATFORM", "ios"),
                ("EARN_PILOT_AD_LATITUDE", "51.5"),
                ("EARN_PILOT_AD_LONGITUDE", "-0.12"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();
        assert_eq!(config.api_base_url, "https://staging.earnpilot.app");
        assert_eq!(config.platform, Platform::Ios);
        assert_eq!(config.ad_location.map(|l| l.longitude), Some(-0.12));
    }

    #[test]
    fn half_a_location_is_rejected() {
        let mut config = PilotConfig::default();
        let err = config
            .merge_with_vars(vars(&[("EARN_PILOT_AD_LATITUDE", "51.5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn bad_values_fail_validation() {
        let config = PilotConfig {
            api_base_url: "api.earnpilot.app".to_string(),
            ..PilotConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PilotConfig {
            ad_location: Some(GeoLocation {
                latitude: 123.0,
                longitude: 0.0,
                accuracy_m: None,
            }),
            ..PilotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
