//! Ad policy retrieval
//!
//! The policy is held in memory only and refetched on every transition to
//! the foreground. A failed fetch keeps the last policy that was fetched; if
//! there is none, the disabled default applies and no ads are served.

use parking_lot::RwLock;
use pilot_core::effects::BackendEffects;
use pilot_core::{AdPolicy, Platform};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches and holds the current [`AdPolicy`]
pub struct ConfigFetcher {
    backend: Arc<dyn BackendEffects>,
    platform: Platform,
    current: RwLock<Option<AdPolicy>>,
}

impl ConfigFetcher {
    /// Fetcher for `platform`
    pub fn new(backend: Arc<dyn BackendEffects>, platform: Platform) -> Self {
        Self {
            backend,
            platform,
            current: RwLock::new(None),
        }
    }

    /// Fetch the policy and make it current.
    ///
    /// Never fails: on error the previous policy (or the default) is returned.
    pub async fn refresh(&self, bearer: Option<&str>) -> AdPolicy {
        match self.backend.fetch_ad_policy(bearer, self.platform).await {
            Ok(policy) => {
                debug!(
                    enabled = policy.is_enabled,
                    test_mode = policy.test_mode,
                    "ad policy fetched"
                );
                *self.current.write() = Some(policy.clone());
                policy
            }
            Err(err) => {
                warn!(error = %err, "ad policy fetch failed, keeping previous policy");
                self.current()
            }
        }
    }

    /// Current policy, or the disabled default before the first fetch
    pub fn current(&self) -> AdPolicy {
        self.current.read().clone().unwrap_or_default()
    }

    /// A policy has been fetched successfully at least once
    pub fn has_policy(&self) -> bool {
        self.current.read().is_some()
    }

    /// Platform sent with each fetch
    pub fn platform(&self) -> Platform {
        self.platform
    }
}
