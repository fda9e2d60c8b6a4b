//! Mutation engine: validated add/remove/tap/undo over the event store.
//!
//! The engine itself is stateless; it borrows the store mutably for the
//! duration of one operation and takes the current instant as an argument, so
//! every outcome is a deterministic function of `(store, config, inputs)`.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::LedgerConfig;
use crate::error::AddUnitsError;
use crate::ledger::{PenaltyEvent, UnitEvent};
use crate::store::EventStore;

/// Caller-supplied entitlement gate consulted before each add. The engine
/// performs no quota accounting of its own.
pub trait QuotaGate {
    /// Whether the caller may log units against this habit on this day.
    fn allows_add(&self, habit_id: &str, date: NaiveDate) -> bool;
}

/// Gate that allows everything.
pub struct Unmetered;

impl QuotaGate for Unmetered {
    fn allows_add(&self, _habit_id: &str, _date: NaiveDate) -> bool {
        true
    }
}

/// Result of a successful add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Units actually logged after the per-event ceiling.
    pub added: u32,
    /// The habit's raw total for the day after the add.
    pub new_total: u32,
    /// True exactly when this add moved the raw total across the daily goal
    /// from below. Hosts use it to fire a "goal just reached" signal once.
    pub goal_reached: bool,
}

/// Stateless mutation engine parameterized by the ledger configuration.
#[derive(Debug, Clone)]
pub struct MutationEngine {
    config: LedgerConfig,
}

impl MutationEngine {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Log `count` units against a habit. A zero count is a no-op that still
    /// succeeds; unknown or archived habits and gate rejections are errors.
    pub fn add_units(
        &self,
        store: &mut EventStore,
        gate: &dyn QuotaGate,
        habit_id: &str,
        count: u32,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AddOutcome, AddUnitsError> {
        let habit = store
            .habit(habit_id)
            .ok_or_else(|| AddUnitsError::HabitNotFound(habit_id.to_string()))?;
        if habit.is_archived {
            return Err(AddUnitsError::HabitArchived(habit_id.to_string()));
        }
        let goal = habit.daily_goal;

        if !gate.allows_add(habit_id, date) {
            return Err(AddUnitsError::QuotaExceeded(habit_id.to_string()));
        }

        let before = store.raw_units(habit_id, date);
        if count == 0 {
            return Ok(AddOutcome {
                added: 0,
                new_total: before,
                goal_reached: false,
            });
        }

        let added = count.min(self.config.max_units_per_event);
        store.push_unit_event(UnitEvent::new(habit_id, added, date, now));

        let new_total = before + added;
        Ok(AddOutcome {
            added,
            new_total,
            goal_reached: before < goal && new_total >= goal,
        })
    }

    /// Remove up to `count` units from a habit's day, newest entries first.
    ///
    /// Events are walked in `created_at`-descending order; a fully consumed
    /// event is deleted, the first partially consumed one has its count
    /// reduced and the walk stops. Removing more than is available removes
    /// everything. Returns false when the day has no events for the habit.
    pub fn remove_units(
        &self,
        store: &mut EventStore,
        habit_id: &str,
        count: u32,
        date: NaiveDate,
    ) -> bool {
        // Newest first; id breaks created_at ties deterministically.
        let mut day_events: Vec<(DateTime<Utc>, String, u32)> = store
            .unit_events()
            .iter()
            .filter(|e| e.habit_id == habit_id && e.date == date)
            .map(|e| (e.created_at, e.id.clone(), e.count))
            .collect();
        if day_events.is_empty() || count == 0 {
            return false;
        }
        day_events.sort_by(|a, b| (&b.0, &b.1).cmp(&(&a.0, &a.1)));

        let total: u32 = day_events.iter().map(|(_, _, c)| *c).sum();
        let mut remaining = count.min(total);

        let mut deleted: Vec<String> = Vec::new();
        let mut reduced: Option<(String, u32)> = None;
        for (_, id, event_count) in day_events {
            if remaining == 0 {
                break;
            }
            if event_count <= remaining {
                remaining -= event_count;
                deleted.push(id);
            } else {
                reduced = Some((id, event_count - remaining));
                break;
            }
        }

        let events = store.unit_events_mut();
        events.retain(|e| !deleted.contains(&e.id));
        if let Some((id, new_count)) = reduced {
            if let Some(event) = events.iter_mut().find(|e| e.id == id) {
                event.count = new_count;
            }
        }
        true
    }

    /// Record a bad-habit tap for the day.
    ///
    /// The penalty value is `penalty_rate` of the day's effective total as it
    /// stands *before* this tap, rounded to the nearest unit and frozen into
    /// the event. Successive same-day taps therefore each take a fraction of
    /// what remains, not of the original raw total. Returns false (no-op)
    /// when an active tap already exists for the pair or the bad habit is
    /// unknown or archived.
    pub fn tap_bad_habit(
        &self,
        store: &mut EventStore,
        bad_habit_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> bool {
        match store.bad_habit(bad_habit_id) {
            Some(b) if !b.is_archived => {}
            _ => return false,
        }
        if store.active_tap(bad_habit_id, date).is_some() {
            return false;
        }

        let effective = store.effective_total(date);
        let penalty_units = (f64::from(effective) * self.config.penalty_rate).round() as u32;
        store.push_penalty_event(PenaltyEvent::new(bad_habit_id, date, now, penalty_units));
        true
    }

    /// Soft-delete the active tap for the pair. Returns false when none
    /// exists; reversible only by tapping again.
    pub fn undo_bad_habit_tap(
        &self,
        store: &mut EventStore,
        bad_habit_id: &str,
        date: NaiveDate,
    ) -> bool {
        let events = store.penalty_events_mut();
        match events
            .iter_mut()
            .find(|e| e.bad_habit_id == bad_habit_id && e.date == date && !e.is_undone)
        {
            Some(event) => {
                event.is_undone = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{BadHabit, Habit};
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, h, 0, 0).unwrap()
    }

    fn setup(goal: u32) -> (MutationEngine, EventStore, String) {
        let mut store = EventStore::new();
        let habit = Habit::new("Run", goal, 1, day(1));
        let id = habit.id.clone();
        store.upsert_habit(habit);
        (MutationEngine::new(LedgerConfig::default()), store, id)
    }

    struct DenyAll;
    impl QuotaGate for DenyAll {
        fn allows_add(&self, _: &str, _: NaiveDate) -> bool {
            false
        }
    }

    #[test]
    fn test_add_unknown_habit_fails() {
        let (engine, mut store, _) = setup(10);
        let err = engine
            .add_units(&mut store, &Unmetered, "nope", 3, day(5), ts(8))
            .unwrap_err();
        assert_eq!(err, AddUnitsError::HabitNotFound("nope".into()));
    }

    #[test]
    fn test_add_archived_habit_fails() {
        let (engine, mut store, id) = setup(10);
        let mut archived = store.habit(&id).unwrap().clone();
        archived.is_archived = true;
        store.upsert_habit(archived);

        let err = engine
            .add_units(&mut store, &Unmetered, &id, 3, day(5), ts(8))
            .unwrap_err();
        assert_eq!(err, AddUnitsError::HabitArchived(id));
    }

    #[test]
    fn test_add_respects_quota_gate() {
        let (engine, mut store, id) = setup(10);
        let err = engine
            .add_units(&mut store, &DenyAll, &id, 3, day(5), ts(8))
            .unwrap_err();
        assert!(matches!(err, AddUnitsError::QuotaExceeded(_)));
        assert!(store.unit_events().is_empty());
    }

    #[test]
    fn test_add_zero_is_noop() {
        let (engine, mut store, id) = setup(10);
        let outcome = engine
            .add_units(&mut store, &Unmetered, &id, 0, day(5), ts(8))
            .unwrap();
        assert_eq!(outcome.added, 0);
        assert!(!outcome.goal_reached);
        assert!(store.unit_events().is_empty());
    }

    #[test]
    fn test_add_clamps_to_per_event_ceiling() {
        let (engine, mut store, id) = setup(10);
        let outcome = engine
            .add_units(&mut store, &Unmetered, &id, 100_000, day(5), ts(8))
            .unwrap();
        assert_eq!(outcome.added, 500);
        assert_eq!(store.raw_units(&id, day(5)), 500);
    }

    #[test]
    fn test_goal_reached_fires_exactly_on_crossing() {
        let (engine, mut store, id) = setup(10);
        let first = engine
            .add_units(&mut store, &Unmetered, &id, 6, day(5), ts(8))
            .unwrap();
        assert!(!first.goal_reached);

        let crossing = engine
            .add_units(&mut store, &Unmetered, &id, 6, day(5), ts(9))
            .unwrap();
        assert!(crossing.goal_reached);
        assert_eq!(crossing.new_total, 12);

        // Already above goal: no re-fire
        let after = engine
            .add_units(&mut store, &Unmetered, &id, 1, day(5), ts(10))
            .unwrap();
        assert!(!after.goal_reached);
    }

    #[test]
    fn test_remove_is_lifo_with_partial_consumption() {
        let (engine, mut store, id) = setup(10);
        engine.add_units(&mut store, &Unmetered, &id, 3, day(5), ts(8)).unwrap();
        engine.add_units(&mut store, &Unmetered, &id, 2, day(5), ts(9)).unwrap();

        assert!(engine.remove_units(&mut store, &id, 4, day(5)));

        // Newer event (count 2) deleted, older reduced 3 -> 1
        let remaining: Vec<u32> = store
            .unit_events()
            .iter()
            .filter(|e| e.habit_id == id)
            .map(|e| e.count)
            .collect();
        assert_eq!(remaining, vec![1]);
        assert_eq!(store.raw_units(&id, day(5)), 1);
    }

    #[test]
    fn test_remove_more_than_available_drains_day() {
        let (engine, mut store, id) = setup(10);
        engine.add_units(&mut store, &Unmetered, &id, 3, day(5), ts(8)).unwrap();
        assert!(engine.remove_units(&mut store, &id, 99, day(5)));
        assert_eq!(store.raw_units(&id, day(5)), 0);
    }

    #[test]
    fn test_remove_with_no_events_is_false() {
        let (engine, mut store, id) = setup(10);
        assert!(!engine.remove_units(&mut store, &id, 1, day(5)));
    }

    #[test]
    fn test_remove_leaves_other_days_untouched() {
        let (engine, mut store, id) = setup(10);
        engine.add_units(&mut store, &Unmetered, &id, 3, day(5), ts(8)).unwrap();
        engine
            .add_units(&mut store, &Unmetered, &id, 7, day(6), ts(8) + Duration::days(1))
            .unwrap();

        engine.remove_units(&mut store, &id, 3, day(5));
        assert_eq!(store.raw_units(&id, day(5)), 0);
        assert_eq!(store.raw_units(&id, day(6)), 7);
    }

    #[test]
    fn test_tap_captures_ten_percent_of_remaining() {
        let (engine, mut store, id) = setup(20);
        let mut bad = BadHabit::new("Doomscroll", day(1));
        let bad_id = bad.id.clone();
        store.upsert_bad_habit(bad.clone());
        engine.add_units(&mut store, &Unmetered, &id, 44, day(5), ts(8)).unwrap();

        assert!(engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(9)));
        assert_eq!(store.active_penalty(day(5)), 4); // round(44 * 0.10)

        // Second same-day tap on the same bad habit is a no-op
        assert!(!engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(10)));
        assert_eq!(store.penalty_events().len(), 1);

        // Archived bad habits cannot be tapped
        bad.is_archived = true;
        store.upsert_bad_habit(bad);
        assert!(!engine.tap_bad_habit(&mut store, &bad_id, day(6), ts(11)));
    }

    #[test]
    fn test_second_bad_habit_tap_sees_reduced_remainder() {
        let (engine, mut store, id) = setup(20);
        let b1 = BadHabit::new("Doomscroll", day(1));
        let b2 = BadHabit::new("Snacking", day(1));
        let (id1, id2) = (b1.id.clone(), b2.id.clone());
        store.upsert_bad_habit(b1);
        store.upsert_bad_habit(b2);
        engine.add_units(&mut store, &Unmetered, &id, 100, day(5), ts(8)).unwrap();

        engine.tap_bad_habit(&mut store, &id1, day(5), ts(9));
        assert_eq!(store.active_penalty(day(5)), 10);

        // Second tap takes 10% of the remaining 90, not of 100
        engine.tap_bad_habit(&mut store, &id2, day(5), ts(10));
        assert_eq!(store.active_penalty(day(5)), 19);
    }

    #[test]
    fn test_frozen_penalty_survives_later_adds() {
        let (engine, mut store, id) = setup(20);
        let bad = BadHabit::new("Doomscroll", day(1));
        let bad_id = bad.id.clone();
        store.upsert_bad_habit(bad);
        engine.add_units(&mut store, &Unmetered, &id, 40, day(5), ts(8)).unwrap();
        engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(9));
        let frozen = store.penalty_events()[0].penalty_units;

        engine.add_units(&mut store, &Unmetered, &id, 60, day(5), ts(10)).unwrap();
        assert_eq!(store.penalty_events()[0].penalty_units, frozen);
    }

    #[test]
    fn test_undo_then_retap_recomputes() {
        let (engine, mut store, id) = setup(20);
        let bad = BadHabit::new("Doomscroll", day(1));
        let bad_id = bad.id.clone();
        store.upsert_bad_habit(bad);
        engine.add_units(&mut store, &Unmetered, &id, 50, day(5), ts(8)).unwrap();

        engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(9));
        assert!(engine.undo_bad_habit_tap(&mut store, &bad_id, day(5)));
        assert!(!engine.undo_bad_habit_tap(&mut store, &bad_id, day(5)));
        assert_eq!(store.active_penalty(day(5)), 0);

        // Re-tap allowed after undo; recomputed from the restored total
        assert!(engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(10)));
        assert_eq!(store.active_penalty(day(5)), 5);
        assert_eq!(store.penalty_events().len(), 2);
    }

    #[test]
    fn test_tap_with_zero_units_freezes_zero() {
        let (engine, mut store, _) = setup(20);
        let bad = BadHabit::new("Doomscroll", day(1));
        let bad_id = bad.id.clone();
        store.upsert_bad_habit(bad);

        assert!(engine.tap_bad_habit(&mut store, &bad_id, day(5), ts(9)));
        assert_eq!(store.penalty_events()[0].penalty_units, 0);
        assert_eq!(store.active_penalty(day(5)), 0);
    }
}
