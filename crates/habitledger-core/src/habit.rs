//! Habit and bad-habit registry types.
//!
//! Habits are trackable activities with a daily unit goal; bad habits are
//! activities to suppress, penalizing the day's effective score when tapped.
//! Both are soft-deleted via archiving so historical events stay meaningful.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest count a single tap may log.
pub const MAX_TAP_INCREMENT: u32 = 500;

/// A trackable activity with a daily unit goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Units required for a completed day (at least 1)
    pub daily_goal: u32,
    /// Units logged per tap (1..=500)
    pub tap_increment: u32,
    /// Archived habits are excluded from aggregates and penalty sharing;
    /// their events are retained.
    pub is_archived: bool,
    /// Day the habit was created; it does not appear in earlier days.
    pub created_at: NaiveDate,
}

impl Habit {
    /// Create a habit with a fresh id. Goal and increment are clamped into
    /// their valid ranges rather than rejected.
    pub fn new(name: impl Into<String>, daily_goal: u32, tap_increment: u32, created_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            daily_goal: daily_goal.max(1),
            tap_increment: tap_increment.clamp(1, MAX_TAP_INCREMENT),
            is_archived: false,
            created_at,
        }
    }

    /// Whether the habit counts toward aggregates on the given date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        !self.is_archived && self.created_at <= date
    }
}

/// A trackable activity to reduce. Each active tap against it subtracts a
/// frozen share of units from the day's effective total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadHabit {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Archived bad habits can no longer be tapped; past taps keep counting.
    pub is_archived: bool,
    /// Day the bad habit was created.
    pub created_at: NaiveDate,
}

impl BadHabit {
    /// Create a bad habit with a fresh id.
    pub fn new(name: impl Into<String>, created_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            is_archived: false,
            created_at,
        }
    }
}
