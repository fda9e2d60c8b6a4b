//! Event store: the registries, both event collections, and pure queries.
//!
//! The store is a plain `Clone`-able value. The host UI owns the one mutable
//! reference and drives all writes through the mutation engine; everything
//! here either returns a computed value or replaces a whole collection, so a
//! clone taken before a mutation is a consistent snapshot.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::DateRange;
use crate::habit::{BadHabit, Habit};
use crate::ledger::{PenaltyEvent, UnitEvent};

/// In-memory snapshot of all tracked state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStore {
    habits: Vec<Habit>,
    bad_habits: Vec<BadHabit>,
    unit_events: Vec<UnitEvent>,
    penalty_events: Vec<PenaltyEvent>,
}

impl EventStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // --- registry access ---

    /// Look up a habit by id.
    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == habit_id)
    }

    /// Look up a bad habit by id.
    pub fn bad_habit(&self, bad_habit_id: &str) -> Option<&BadHabit> {
        self.bad_habits.iter().find(|b| b.id == bad_habit_id)
    }

    /// All habits, archived included.
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    /// All bad habits, archived included.
    pub fn bad_habits(&self) -> &[BadHabit] {
        &self.bad_habits
    }

    /// Habits that count toward aggregates on the given day: created on or
    /// before it and not archived.
    pub fn habits_on(&self, date: NaiveDate) -> Vec<&Habit> {
        self.habits.iter().filter(|h| h.is_active_on(date)).collect()
    }

    /// Insert a habit, or overwrite the entry with the same id.
    pub fn upsert_habit(&mut self, habit: Habit) {
        match self.habits.iter_mut().find(|h| h.id == habit.id) {
            Some(slot) => *slot = habit,
            None => self.habits.push(habit),
        }
    }

    /// Insert a bad habit, or overwrite the entry with the same id.
    pub fn upsert_bad_habit(&mut self, bad_habit: BadHabit) {
        match self.bad_habits.iter_mut().find(|b| b.id == bad_habit.id) {
            Some(slot) => *slot = bad_habit,
            None => self.bad_habits.push(bad_habit),
        }
    }

    /// Delete a habit together with every unit event logged against it.
    /// Returns false when the id is unknown.
    pub fn delete_habit(&mut self, habit_id: &str) -> bool {
        let before = self.habits.len();
        self.habits.retain(|h| h.id != habit_id);
        if self.habits.len() == before {
            return false;
        }
        self.unit_events.retain(|e| e.habit_id != habit_id);
        true
    }

    /// Delete a bad habit together with its penalty events (active and
    /// undone). Returns false when the id is unknown.
    pub fn delete_bad_habit(&mut self, bad_habit_id: &str) -> bool {
        let before = self.bad_habits.len();
        self.bad_habits.retain(|b| b.id != bad_habit_id);
        if self.bad_habits.len() == before {
            return false;
        }
        self.penalty_events.retain(|e| e.bad_habit_id != bad_habit_id);
        true
    }

    // --- event access ---

    /// All unit events.
    pub fn unit_events(&self) -> &[UnitEvent] {
        &self.unit_events
    }

    /// All penalty events, undone included.
    pub fn penalty_events(&self) -> &[PenaltyEvent] {
        &self.penalty_events
    }

    pub(crate) fn push_unit_event(&mut self, event: UnitEvent) {
        self.unit_events.push(event);
    }

    pub(crate) fn push_penalty_event(&mut self, event: PenaltyEvent) {
        self.penalty_events.push(event);
    }

    pub(crate) fn unit_events_mut(&mut self) -> &mut Vec<UnitEvent> {
        &mut self.unit_events
    }

    pub(crate) fn penalty_events_mut(&mut self) -> &mut Vec<PenaltyEvent> {
        &mut self.penalty_events
    }

    // --- whole-collection replacement (persistence pull) ---

    pub fn replace_habits(&mut self, habits: Vec<Habit>) {
        self.habits = habits;
    }

    pub fn replace_bad_habits(&mut self, bad_habits: Vec<BadHabit>) {
        self.bad_habits = bad_habits;
    }

    pub fn replace_unit_events(&mut self, events: Vec<UnitEvent>) {
        self.unit_events = events;
    }

    pub fn replace_penalty_events(&mut self, events: Vec<PenaltyEvent>) {
        self.penalty_events = events;
    }

    // --- derived queries ---

    /// Raw (unadjusted) units logged for a habit on a day.
    pub fn raw_units(&self, habit_id: &str, date: NaiveDate) -> u32 {
        self.unit_events
            .iter()
            .filter(|e| e.habit_id == habit_id && e.date == date)
            .map(|e| e.count)
            .sum()
    }

    /// Raw units logged for a habit across an inclusive day range.
    pub fn raw_units_in(&self, habit_id: &str, range: DateRange) -> u32 {
        self.unit_events
            .iter()
            .filter(|e| e.habit_id == habit_id && range.contains(e.date))
            .map(|e| e.count)
            .sum()
    }

    /// Raw units per active habit for a day. Habits with no events map to 0.
    pub fn raw_by_habit(&self, date: NaiveDate) -> HashMap<String, u32> {
        self.habits_on(date)
            .into_iter()
            .map(|h| (h.id.clone(), self.raw_units(&h.id, date)))
            .collect()
    }

    /// Sum of raw units over the habits active on the day.
    pub fn raw_total(&self, date: NaiveDate) -> u32 {
        self.habits_on(date)
            .iter()
            .map(|h| self.raw_units(&h.id, date))
            .sum()
    }

    /// Sum of the day's non-undone penalty events.
    pub fn active_penalty(&self, date: NaiveDate) -> u32 {
        self.penalty_events
            .iter()
            .filter(|e| e.date == date && !e.is_undone)
            .map(|e| e.penalty_units)
            .sum()
    }

    /// The day's effective total: raw minus penalty, floored at zero.
    pub fn effective_total(&self, date: NaiveDate) -> u32 {
        let raw = self.raw_total(date);
        raw.saturating_sub(self.active_penalty(date))
    }

    /// The active (non-undone) penalty event for a pair, if any.
    pub fn active_tap(&self, bad_habit_id: &str, date: NaiveDate) -> Option<&PenaltyEvent> {
        self.penalty_events
            .iter()
            .find(|e| e.bad_habit_id == bad_habit_id && e.date == date && !e.is_undone)
    }
}
