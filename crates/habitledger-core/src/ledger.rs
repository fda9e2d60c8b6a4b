//! Append-only ledger records.
//!
//! Unit events are kept unaggregated so history stays reconstructible and
//! removal can target specific entries. Penalty events capture their unit
//! value at tap time and are never recomputed afterwards; undoing a tap is a
//! soft delete so the record survives for audit and re-tap logic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logged batch of effort units against a habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEvent {
    /// Unique identifier
    pub id: String,
    /// Habit the units were logged against
    pub habit_id: String,
    /// Number of units; reduced in place by partial removal
    pub count: u32,
    /// Day the units count toward
    pub date: NaiveDate,
    /// Wall-clock creation time; removal walks these newest-first
    pub created_at: DateTime<Utc>,
}

impl UnitEvent {
    /// Create an event with a fresh id.
    pub fn new(habit_id: impl Into<String>, count: u32, date: NaiveDate, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            habit_id: habit_id.into(),
            count,
            date,
            created_at,
        }
    }
}

/// One bad-habit tap. `penalty_units` is frozen at creation: later adds or
/// removes on the same day never change it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyEvent {
    /// Unique identifier
    pub id: String,
    /// Bad habit that was tapped
    pub bad_habit_id: String,
    /// Day the tap counts against
    pub date: NaiveDate,
    /// Wall-clock creation time
    pub created_at: DateTime<Utc>,
    /// Units subtracted from the day's effective total, fixed at tap time
    pub penalty_units: u32,
    /// Soft-delete flag set by undo; at most one non-undone event exists per
    /// `(bad_habit_id, date)` pair.
    pub is_undone: bool,
}

impl PenaltyEvent {
    /// Create an active event with a fresh id.
    pub fn new(
        bad_habit_id: impl Into<String>,
        date: NaiveDate,
        created_at: DateTime<Utc>,
        penalty_units: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bad_habit_id: bad_habit_id.into(),
            date,
            created_at,
            penalty_units,
            is_undone: false,
        }
    }
}
