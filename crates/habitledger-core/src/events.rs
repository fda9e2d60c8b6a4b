use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Every successful mutation on the session produces an Event.
/// The host UI polls for events; a sync mirror subscribes to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    UnitsAdded {
        habit_id: String,
        count: u32,
        date: NaiveDate,
        new_total: u32,
        at: DateTime<Utc>,
    },
    /// The add that crossed the habit's daily goal from below. Emitted at
    /// most once per crossing, alongside the matching `UnitsAdded`.
    GoalReached {
        habit_id: String,
        daily_goal: u32,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    UnitsRemoved {
        habit_id: String,
        count: u32,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    BadHabitTapped {
        bad_habit_id: String,
        penalty_units: u32,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    TapUndone {
        bad_habit_id: String,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    /// The session's notion of "today" advanced at a checkpoint.
    DayRolledOver {
        from: NaiveDate,
        to: NaiveDate,
        at: DateTime<Utc>,
    },
}
