//! Mini-game eligibility and local play statistics.

use crate::time::PhysicalTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response of the backend "can play" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEligibility {
    /// The game may start right now
    pub can_play: bool,
    /// Seconds until the game may be played again
    #[serde(default)]
    pub remaining_seconds: u64,
}

impl GameEligibility {
    /// Remaining cooldown, zero whenever the backend says the game is playable
    pub fn effective_remaining(&self) -> u64 {
        if self.can_play {
            0
        } else {
            self.remaining_seconds
        }
    }
}

/// One cached cooldown observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCooldown {
    /// Backend game id
    pub game_id: u64,
    /// Game slug (cache key)
    pub game_slug: String,
    /// Remaining seconds at `last_checked_at`
    pub remaining_seconds: u64,
    /// When the value was observed
    pub last_checked_at: PhysicalTime,
}

impl GameCooldown {
    /// Remaining seconds at `now`, counting down from the observation.
    pub fn remaining_at(&self, now: PhysicalTime) -> u64 {
        self.remaining_seconds
            .saturating_sub(now.secs_since(self.last_checked_at))
    }

    /// Observation is younger than `window_secs`
    pub fn is_fresh(&self, now: PhysicalTime, window_secs: u64) -> bool {
        now.millis_since(self.last_checked_at) < window_secs.saturating_mul(1000)
    }
}

/// Per-game aggregate kept in `gameStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStat {
    /// Number of completed sessions
    pub plays: u64,
    /// Best score seen locally
    pub best_score: u64,
    /// Score of the latest session
    pub last_score: u64,
}

/// All local game stats, keyed by slug.
pub type GameStats = BTreeMap<String, GameStat>;

/// Last play time per slug (epoch ms), kept in `lastGameTimes`.
pub type LastGameTimes = BTreeMap<String, u64>;

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(remaining: u64, at_ms: u64) -> GameCooldown {
        GameCooldown {
            game_id: 7,
            game_slug: "math-quiz".to_string(),
            remaining_seconds: remaining,
            last_checked_at: PhysicalTime::from_ms(at_ms),
        }
    }

    #[test]
    fn remaining_counts_down_and_floors_at_zero() {
        let entry = observed(40, 10_000);
        assert_eq!(entry.remaining_at(PhysicalTime::from_ms(12_000)), 38);
        assert_eq!(entry.remaining_at(PhysicalTime::from_ms(100_000)), 0);
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let entry = observed(40, 10_000);
        assert!(entry.is_fresh(PhysicalTime::from_ms(19_999), 10));
        assert!(!entry.is_fresh(PhysicalTime::from_ms(20_000), 10));
    }

    #[test]
    fn playable_means_no_cooldown() {
        let e = GameEligibility {
            can_play: true,
            remaining_seconds: 30,
        };
        assert_eq!(e.effective_remaining(), 0);
    }
}
