//! Time values passed through the effect system.
//!
//! Core code never reads the wall clock directly; it receives a
//! [`PhysicalTime`] from `PhysicalTimeEffects` and derives everything else
//! (elapsed seconds, calendar days) from it.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Wrap a millisecond timestamp
    pub const fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero when the
    /// clock went backwards.
    pub fn millis_since(&self, earlier: PhysicalTime) -> u64 {
        self.ts_ms.saturating_sub(earlier.ts_ms)
    }

    /// Whole seconds elapsed since `earlier`.
    pub fn secs_since(&self, earlier: PhysicalTime) -> u64 {
        self.millis_since(earlier) / 1000
    }

    /// Calendar day of this instant in the given UTC offset.
    pub fn calendar_day(&self, utc_offset_minutes: i32) -> CalendarDay {
        CalendarDay::from_epoch_ms(self.ts_ms, utc_offset_minutes)
    }
}

/// A calendar date (`YYYY-MM-DD`) used for daily quota resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Day containing `ts_ms`, shifted by `utc_offset_minutes`.
    ///
    /// Offsets outside ±24h are clamped to UTC.
    pub fn from_epoch_ms(ts_ms: u64, utc_offset_minutes: i32) -> Self {
        let offset =
            FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix());
        let millis = i64::try_from(ts_ms).unwrap_or(i64::MAX);
        let utc = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
        Self(utc.with_timezone(&offset).date_naive())
    }

    /// Underlying date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
