//! Anchored day offsets.

use chrono::{Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 86_400_000;

// Both dates are pinned to the same fixed time-of-day before
// differencing, so daylight-saving shifts or midnight rounding can
// never skew the day count.
static NOON: Lazy<NaiveTime> = Lazy::new(|| NaiveTime::from_hms_opt(12, 0, 0).unwrap());

/// The fixed reference date for one episode/bundle. All other dates in
/// the bundle are expressed relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalAnchor {
    /// Index date (e.g. the index procedure date).
    pub index_date: NaiveDate,
}

impl TemporalAnchor {
    /// Anchor at the given index date.
    pub fn new(index_date: NaiveDate) -> Self {
        TemporalAnchor { index_date }
    }

    /// Signed day offset from the anchor to `target`.
    pub fn offset_to(&self, target: NaiveDate) -> i64 {
        offset_days(self.index_date, target)
    }
}

/// Signed day count from `anchor` to `target`.
pub fn offset_days(anchor: NaiveDate, target: NaiveDate) -> i64 {
    let anchor_ms = anchor.and_time(*NOON).and_utc().timestamp_millis();
    let target_ms = target.and_time(*NOON).and_utc().timestamp_millis();
    ((target_ms - anchor_ms) as f64 / MS_PER_DAY as f64).round() as i64
}

/// Render a day offset as `T+n` / `T-n`.
///
/// `n` is the absolute value; zero always renders `T+0`.
pub fn format_offset(days: i64) -> String {
    if days < 0 {
        format!("T-{}", days.unsigned_abs())
    } else {
        format!("T+{}", days)
    }
}

/// `date + n` days, `None` on calendar overflow.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}
