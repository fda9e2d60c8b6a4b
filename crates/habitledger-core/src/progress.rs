//! Daily progress calculator.
//!
//! Composes the store's raw queries with the penalty distribution into the
//! single summary the UI renders: per-habit goal flags, the day's progress
//! percentage, and the perfect-day / improvement aggregates.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::penalty::distribute;
use crate::store::EventStore;

/// Round to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Per-habit slice of the daily summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitProgress {
    pub habit_id: String,
    pub name: String,
    pub daily_goal: u32,
    /// Unadjusted units logged today
    pub raw: u32,
    /// Units after this habit's share of the day's penalty
    pub effective: u32,
    /// Goal met on raw units
    pub raw_goal_met: bool,
    /// Goal met on effective units
    pub goal_met: bool,
    /// Effective units reached at least twice the goal
    pub doubled: bool,
}

/// The daily summary consumed by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    /// One entry per habit active on the date, ordered by id
    pub habits: Vec<HabitProgress>,
    pub raw_total: u32,
    pub effective_total: u32,
    /// Sum of the active habits' daily goals
    pub total_goal: u32,
    /// Sum of the day's active (non-undone) penalty events
    pub total_penalty: u32,
    /// Every habit met its goal on raw units
    pub raw_all_goals_met: bool,
    /// Every habit met its goal on effective units (vacuously true when the
    /// day has no active habits)
    pub all_goals_met: bool,
    pub has_bad_habits: bool,
    /// All goals met on effective units and no bad-habit taps
    pub perfect_day: bool,
    /// Daily progress percentage, one decimal place. Exceeds 100 only once
    /// every goal is met; before that each habit's contribution is capped at
    /// its own goal so one habit's overflow cannot mask another's shortfall.
    pub percentage: f64,
    /// Bottleneck multiplier: the smallest effective/goal ratio across
    /// habits, one decimal place; 0 until every goal is met.
    pub improvement_percent: f64,
    pub doubled_count: usize,
    pub all_goals_doubled: bool,
}

/// Compute the daily summary for a date.
pub fn daily_progress(store: &EventStore, date: NaiveDate) -> DailyProgress {
    let mut active = store.habits_on(date);
    active.sort_by(|a, b| a.id.cmp(&b.id));

    let habit_ids: Vec<String> = active.iter().map(|h| h.id.clone()).collect();
    let raw_by_habit: HashMap<String, u32> = store.raw_by_habit(date);
    let raw_total = store.raw_total(date);
    let total_penalty = store.active_penalty(date);

    let effective_by_habit = distribute(&raw_by_habit, raw_total, total_penalty, &habit_ids);
    let effective_total = raw_total.saturating_sub(total_penalty);

    let habits: Vec<HabitProgress> = active
        .iter()
        .map(|h| {
            let raw = raw_by_habit.get(&h.id).copied().unwrap_or(0);
            let effective = effective_by_habit.get(&h.id).copied().unwrap_or(raw);
            HabitProgress {
                habit_id: h.id.clone(),
                name: h.name.clone(),
                daily_goal: h.daily_goal,
                raw,
                effective,
                raw_goal_met: raw >= h.daily_goal,
                goal_met: effective >= h.daily_goal,
                doubled: effective >= 2 * h.daily_goal,
            }
        })
        .collect();

    let total_goal: u32 = habits.iter().map(|h| h.daily_goal).sum();
    let raw_all_goals_met = habits.iter().all(|h| h.raw_goal_met);
    let all_goals_met = habits.iter().all(|h| h.goal_met);
    let has_bad_habits = total_penalty > 0;
    let doubled_count = habits.iter().filter(|h| h.doubled).count();

    let percentage = if total_goal == 0 {
        0.0
    } else if all_goals_met {
        round1(f64::from(effective_total) / f64::from(total_goal) * 100.0)
    } else {
        let capped: u32 = habits.iter().map(|h| h.effective.min(h.daily_goal)).sum();
        round1(f64::from(capped) / f64::from(total_goal) * 100.0)
    };

    let improvement_percent = if all_goals_met && !habits.is_empty() {
        let bottleneck = habits
            .iter()
            .map(|h| f64::from(h.effective) / f64::from(h.daily_goal))
            .fold(f64::INFINITY, f64::min);
        round1(bottleneck)
    } else {
        0.0
    };

    DailyProgress {
        date,
        raw_total,
        effective_total,
        total_goal,
        total_penalty,
        raw_all_goals_met,
        all_goals_met,
        has_bad_habits,
        perfect_day: all_goals_met && !has_bad_habits,
        percentage,
        improvement_percent,
        doubled_count,
        all_goals_doubled: doubled_count == habits.len() && !habits.is_empty(),
        habits,
    }
}
