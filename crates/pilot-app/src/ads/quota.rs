//! Rewarded ad daily quota

use pilot_core::CalendarDay;

/// Completions counted against today's cap. Held in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardedQuota {
    /// Completions on `last_date`
    pub watched_today: u32,
    /// Day the counter belongs to
    pub last_date: Option<CalendarDay>,
}

impl RewardedQuota {
    /// Reset the counter if `today` differs from the stored day.
    pub fn roll_over(&mut self, today: CalendarDay) {
        if self.last_date != Some(today) {
            self.watched_today = 0;
            self.last_date = Some(today);
        }
    }

    /// Another rewarded ad may be shown today
    pub fn has_remaining(&self, today: CalendarDay, max_per_day: u32) -> bool {
        let watched = if self.last_date == Some(today) {
            self.watched_today
        } else {
            0
        };
        watched < max_per_day
    }

    /// Count one completion on `today`
    pub fn record(&mut self, today: CalendarDay) {
        self.roll_over(today);
        self.watched_today = self.watched_today.saturating_add(1);
    }
}
