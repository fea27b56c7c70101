//! Local mini-game statistics
//!
//! Owner of the `gameStats`, `lastGameTimes` and `userGameStats` keys. The
//! backend stays authoritative for points and cooldowns; these records only
//! drive the game list UI.

use crate::cooldown::CooldownCache;
use pilot_core::effects::{storage_keys, PhysicalTimeEffects, StorageEffects, StorageExt};
use pilot_core::{GameStat, GameStats, LastGameTimes, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// One finished play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord<'a> {
    /// Backend game id
    pub game_id: u64,
    /// Game slug
    pub game_slug: &'a str,
    /// Final score
    pub score: u64,
    /// Cooldown the backend reported after the play, if any
    pub cooldown_seconds: Option<i64>,
}

/// Persists play statistics and seeds the cooldown cache
pub struct GameStatsStore {
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn PhysicalTimeEffects>,
    cooldowns: Arc<CooldownCache>,
}

impl GameStatsStore {
    /// Store over the given handlers
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        cooldowns: Arc<CooldownCache>,
    ) -> Self {
        Self {
            storage,
            time,
            cooldowns,
        }
    }

    async fn read_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default + Send,
    {
        match self.storage.retrieve_json::<T>(key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                warn!(key, error = %err, "unreadable game stats, starting fresh");
                T::default()
            }
        }
    }

    /// Per-game statistics keyed by slug
    pub async fn stats(&self) -> GameStats {
        self.read_or_default(storage_keys::GAME_STATS).await
    }

    /// Last play time (epoch ms) keyed by slug
    pub async fn last_play_times(&self) -> LastGameTimes {
        self.read_or_default(storage_keys::LAST_GAME_TIMES).await
    }

    /// Record a finished play and return the updated statistic.
    pub async fn record_play(&self, play: PlayRecord<'_>) -> Result<GameStat> {
        let now = self.time.now_or_epoch().await;

        let mut stats = self.stats().await;
        let entry = stats.entry(play.game_slug.to_string()).or_default();
        entry.plays = entry.plays.saturating_add(1);
        entry.best_score = entry.best_score.max(play.score);
        entry.last_score = play.score;
        let updated = entry.clone();

        let mut times = self.last_play_times().await;
        times.insert(play.game_slug.to_string(), now.ts_ms);

        self.storage
            .store_json(storage_keys::GAME_STATS, &stats)
            .await?;
        self.storage
            .store_json(storage_keys::LAST_GAME_TIMES, &times)
            .await?;

        if let Some(seconds) = play.cooldown_seconds {
            self.cooldowns
                .set_cooldown(play.game_id, play.game_slug, seconds)
                .await;
        }
        debug!(
            game_slug = play.game_slug,
            plays = updated.plays,
            "game play recorded"
        );
        Ok(updated)
    }

    /// Remove all local statistics
    pub async fn clear(&self) -> Result<()> {
        for key in [
            storage_keys::GAME_STATS,
            storage_keys::LAST_GAME_TIMES,
            storage_keys::USER_GAME_STATS,
        ] {
            self.storage.remove(key).await?;
        }
        Ok(())
    }
}
