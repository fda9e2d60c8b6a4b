//! Day keys, period ranges, and explicit day rollover.
//!
//! "Today" is never read implicitly inside the ledger: the host derives it
//! once per checkpoint (process resume, periodic poll) through [`DayTracker`]
//! so an undo can never straddle two calendar days.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Convert a wall-clock timestamp to the day key it belongs to (UTC).
pub fn day_key(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Inclusive range of day keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether the range contains the given day.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// ISO week (Monday through Sunday) containing the given day.
pub fn week_range(date: NaiveDate) -> DateRange {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    let start = date - Duration::days(days_from_monday);
    DateRange {
        start,
        end: start + Duration::days(6),
    }
}

/// Calendar month containing the given day.
pub fn month_range(date: NaiveDate) -> DateRange {
    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .unwrap_or(date);
    let end = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .map(|next| next - Duration::days(1))
    .unwrap_or(date);
    DateRange { start, end }
}

/// Calendar year containing the given day.
pub fn year_range(date: NaiveDate) -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        end: NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
    }
}

/// Tracks the session's notion of "today" and detects rollover at explicit
/// checkpoints instead of running timers inside the ledger.
#[derive(Debug, Clone)]
pub struct DayTracker {
    current: NaiveDate,
}

impl DayTracker {
    /// Start tracking from the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { current: day_key(now) }
    }

    /// The day the tracker currently considers "today".
    pub fn today(&self) -> NaiveDate {
        self.current
    }

    /// Re-derive today from the clock. Returns the new day when it changed,
    /// `None` otherwise. Callers clear any in-flight undo state on `Some`.
    pub fn roll(&mut self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let key = day_key(now);
        if key != self.current {
            self.current = key;
            Some(key)
        } else {
            None
        }
    }
}
