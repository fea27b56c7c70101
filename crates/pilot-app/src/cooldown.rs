//! Per-game cooldown cache
//!
//! Sits in front of `GET /api/games/{id}/can-play`. An entry observed less
//! than the fresh window ago (10 s by default) answers locally, counting the
//! elapsed time down from the observed value; anything older goes back to
//! the backend. Backend failures never block play.

use crate::session::SessionStore;
use parking_lot::Mutex;
use pilot_core::effects::{BackendEffects, PhysicalTimeEffects};
use pilot_core::GameCooldown;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cooldown cache keyed by game slug
pub struct CooldownCache {
    backend: Arc<dyn BackendEffects>,
    time: Arc<dyn PhysicalTimeEffects>,
    session: Arc<SessionStore>,
    fresh_window_secs: u64,
    entries: Mutex<HashMap<String, GameCooldown>>,
}

impl CooldownCache {
    /// Empty cache
    pub fn new(
        backend: Arc<dyn BackendEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        session: Arc<SessionStore>,
        fresh_window_secs: u64,
    ) -> Self {
        Self {
            backend,
            time,
            session,
            fresh_window_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Remaining cooldown in seconds; 0 means playable now.
    pub async fn check_game_cooldown(&self, game_id: u64, game_slug: &str) -> u64 {
        let now = self.time.now_or_epoch().await;
        if let Some(remaining) = self.fresh_remaining(game_slug, now) {
            debug!(game_slug, remaining, "cooldown served from cache");
            return remaining;
        }

        let bearer = self.session.token();
        let result = self
            .backend
            .check_game_eligibility(bearer.as_deref(), game_id, game_slug)
            .await;
        let eligibility = match self.session.intercept(result).await {
            Ok(eligibility) => eligibility,
            Err(err) => {
                warn!(game_slug, error = %err, "eligibility check failed, allowing play");
                return 0;
            }
        };

        let remaining = eligibility.effective_remaining();
        let observed_at = self.time.now_or_epoch().await;
        self.entries.lock().insert(
            game_slug.to_string(),
            GameCooldown {
                game_id,
                game_slug: game_slug.to_string(),
                remaining_seconds: remaining,
                last_checked_at: observed_at,
            },
        );
        debug!(game_slug, remaining, "cooldown refreshed from backend");
        remaining
    }

    fn fresh_remaining(&self, game_slug: &str, now: pilot_core::PhysicalTime) -> Option<u64> {
        let entries = self.entries.lock();
        let entry = entries.get(game_slug)?;
        entry
            .is_fresh(now, self.fresh_window_secs)
            .then(|| entry.remaining_at(now))
    }

    /// Record a cooldown observed locally. Zero or negative removes it.
    pub async fn set_cooldown(&self, game_id: u64, game_slug: &str, seconds: i64) {
        let Ok(remaining_seconds) = u64::try_from(seconds) else {
            self.remove_cooldown(game_slug);
            return;
        };
        if remaining_seconds == 0 {
            self.remove_cooldown(game_slug);
            return;
        }
        let now = self.time.now_or_epoch().await;
        self.entries.lock().insert(
            game_slug.to_string(),
            GameCooldown {
                game_id,
                game_slug: game_slug.to_string(),
                remaining_seconds,
                last_checked_at: now,
            },
        );
    }

    /// Forget the entry for `game_slug`
    pub fn remove_cooldown(&self, game_slug: &str) -> bool {
        self.entries.lock().remove(game_slug).is_some()
    }

    /// Cached entry for `game_slug`, fresh or not
    pub fn get_cooldown(&self, game_slug: &str) -> Option<GameCooldown> {
        self.entries.lock().get(game_slug).cloned()
    }

    /// Remaining seconds of the cached entry at the current time
    pub async fn cached_remaining(&self, game_slug: &str) -> Option<u64> {
        let now = self.time.now_or_epoch().await;
        self.entries
            .lock()
            .get(game_slug)
            .map(|entry| entry.remaining_at(now))
    }
}
