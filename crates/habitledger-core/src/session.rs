//! Host-facing session facade.
//!
//! `LedgerSession` is what a UI layer holds: the event store snapshot, the
//! mutation engine, the persistence collaborator, and the session's notion of
//! "today". Every successful mutation is followed by a fire-and-forget save
//! (a failed save is logged, in-memory state stays authoritative) and, when a
//! sync mirror is attached, an asynchronous-best-effort mirror call whose
//! failures are likewise swallowed.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::calendar::{month_range, week_range, year_range, DayTracker};
use crate::config::LedgerConfig;
use crate::error::{AddUnitsError, RegistryError, Result};
use crate::events::Event;
use crate::habit::{BadHabit, Habit};
use crate::ledger::UnitEvent;
use crate::mutation::{AddOutcome, MutationEngine, QuotaGate, Unmetered};
use crate::penalty::distribute;
use crate::progress::{daily_progress, DailyProgress};
use crate::storage::{HabitStorage, SyncMirror};
use crate::store::EventStore;

/// The most recent add, kept so the host can offer a one-tap undo. Cleared
/// on day rollover so an undo never straddles two calendar days.
#[derive(Debug, Clone)]
struct LastAdd {
    habit_id: String,
    count: u32,
    date: NaiveDate,
}

/// A loaded ledger session driven from one UI event-loop thread.
pub struct LedgerSession {
    store: EventStore,
    engine: MutationEngine,
    storage: Box<dyn HabitStorage>,
    sync: Option<Box<dyn SyncMirror>>,
    gate: Box<dyn QuotaGate>,
    tracker: DayTracker,
    pending_events: Vec<Event>,
    last_add: Option<LastAdd>,
}

impl LedgerSession {
    /// Load all collections from storage and start a session. Load failures
    /// propagate; there is no partially loaded session.
    pub fn load(
        config: LedgerConfig,
        storage: Box<dyn HabitStorage>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut store = EventStore::new();
        store.replace_habits(storage.load_habits()?);
        store.replace_bad_habits(storage.load_bad_habits()?);
        store.replace_unit_events(storage.load_unit_events()?);
        store.replace_penalty_events(storage.load_penalty_events()?);

        Ok(Self {
            store,
            engine: MutationEngine::new(config),
            storage,
            sync: None,
            gate: Box::new(Unmetered),
            tracker: DayTracker::new(now),
            pending_events: Vec::new(),
            last_add: None,
        })
    }

    /// Attach a remote mirror for add/remove events.
    pub fn with_sync(mut self, sync: Box<dyn SyncMirror>) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Replace the entitlement gate consulted before every add.
    pub fn with_quota_gate(mut self, gate: Box<dyn QuotaGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Read-only view of the store snapshot.
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// The session's current day.
    pub fn today(&self) -> NaiveDate {
        self.tracker.today()
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }

    // --- day rollover ---

    /// Checkpoint the clock (call on resume and on a periodic poll). When the
    /// day changed, in-flight undo state is cleared and the new day returned.
    pub fn checkpoint_day(&mut self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let from = self.tracker.today();
        let to = self.tracker.roll(now)?;
        debug!(%from, %to, "day rolled over");
        self.last_add = None;
        self.pending_events.push(Event::DayRolledOver { from, to, at: now });
        Some(to)
    }

    // --- registry operations ---

    /// Create a habit, enforcing the configured quota against the count of
    /// unarchived habits.
    pub fn create_habit(
        &mut self,
        name: impl Into<String>,
        daily_goal: u32,
        tap_increment: u32,
    ) -> Result<Habit, RegistryError> {
        if let Some(quota) = self.engine.config().habit_quota {
            let live = self.store.habits().iter().filter(|h| !h.is_archived).count();
            if live as u32 >= quota {
                return Err(RegistryError::QuotaExceeded(quota));
            }
        }
        let habit = Habit::new(name, daily_goal, tap_increment, self.today());
        self.store.upsert_habit(habit.clone());
        self.persist_habits();
        Ok(habit)
    }

    /// Apply a field mutation to a habit.
    pub fn update_habit(
        &mut self,
        habit_id: &str,
        apply: impl FnOnce(&mut Habit),
    ) -> Result<(), RegistryError> {
        let mut habit = self
            .store
            .habit(habit_id)
            .cloned()
            .ok_or_else(|| RegistryError::HabitNotFound(habit_id.to_string()))?;
        apply(&mut habit);
        habit.daily_goal = habit.daily_goal.max(1);
        habit.tap_increment = habit.tap_increment.clamp(1, crate::habit::MAX_TAP_INCREMENT);
        self.store.upsert_habit(habit);
        self.persist_habits();
        Ok(())
    }

    /// Archive or unarchive a habit.
    pub fn set_habit_archived(&mut self, habit_id: &str, archived: bool) -> Result<(), RegistryError> {
        self.update_habit(habit_id, |h| h.is_archived = archived)
    }

    /// Hard-delete a habit and every unit event logged against it.
    pub fn delete_habit(&mut self, habit_id: &str) -> bool {
        let deleted = self.store.delete_habit(habit_id);
        if deleted {
            self.persist_habits();
            self.persist_unit_events();
        }
        deleted
    }

    /// Create a bad habit.
    pub fn create_bad_habit(&mut self, name: impl Into<String>) -> BadHabit {
        let bad_habit = BadHabit::new(name, self.today());
        self.store.upsert_bad_habit(bad_habit.clone());
        self.persist_bad_habits();
        bad_habit
    }

    /// Archive or unarchive a bad habit.
    pub fn set_bad_habit_archived(
        &mut self,
        bad_habit_id: &str,
        archived: bool,
    ) -> Result<(), RegistryError> {
        let mut bad_habit = self
            .store
            .bad_habit(bad_habit_id)
            .cloned()
            .ok_or_else(|| RegistryError::BadHabitNotFound(bad_habit_id.to_string()))?;
        bad_habit.is_archived = archived;
        self.store.upsert_bad_habit(bad_habit);
        self.persist_bad_habits();
        Ok(())
    }

    /// Hard-delete a bad habit and all of its penalty events.
    pub fn delete_bad_habit(&mut self, bad_habit_id: &str) -> bool {
        let deleted = self.store.delete_bad_habit(bad_habit_id);
        if deleted {
            self.persist_bad_habits();
            self.persist_penalty_events();
        }
        deleted
    }

    // --- ledger mutations ---

    /// Log units against a habit for a day.
    pub fn add_units(
        &mut self,
        habit_id: &str,
        count: u32,
        date: NaiveDate,
    ) -> Result<AddOutcome, AddUnitsError> {
        let now = Utc::now();
        let outcome = self
            .engine
            .add_units(&mut self.store, self.gate.as_ref(), habit_id, count, date, now)?;
        if outcome.added == 0 {
            return Ok(outcome);
        }

        self.last_add = Some(LastAdd {
            habit_id: habit_id.to_string(),
            count: outcome.added,
            date,
        });
        self.pending_events.push(Event::UnitsAdded {
            habit_id: habit_id.to_string(),
            count: outcome.added,
            date,
            new_total: outcome.new_total,
            at: now,
        });
        if outcome.goal_reached {
            let daily_goal = self.store.habit(habit_id).map(|h| h.daily_goal).unwrap_or(0);
            self.pending_events.push(Event::GoalReached {
                habit_id: habit_id.to_string(),
                daily_goal,
                date,
                at: now,
            });
        }

        self.persist_unit_events();
        if let Some(event) = self.newest_event_for(habit_id, date) {
            self.mirror_add(&event);
        }
        Ok(outcome)
    }

    /// Log one tap's worth of units (the habit's `tap_increment`) for today.
    pub fn tap_habit(&mut self, habit_id: &str) -> Result<AddOutcome, AddUnitsError> {
        let increment = self
            .store
            .habit(habit_id)
            .map(|h| h.tap_increment)
            .ok_or_else(|| AddUnitsError::HabitNotFound(habit_id.to_string()))?;
        self.add_units(habit_id, increment, self.today())
    }

    /// Remove units LIFO from a habit's day. Returns false when there was
    /// nothing to remove.
    pub fn remove_units(&mut self, habit_id: &str, count: u32, date: NaiveDate) -> bool {
        if !self.engine.remove_units(&mut self.store, habit_id, count, date) {
            return false;
        }
        self.pending_events.push(Event::UnitsRemoved {
            habit_id: habit_id.to_string(),
            count,
            date,
            at: Utc::now(),
        });
        self.persist_unit_events();
        if let Some(sync) = &self.sync {
            if let Err(e) = sync.mirror_remove(habit_id, count, date) {
                warn!(habit_id, error = %e, "sync mirror rejected remove; local state kept");
            }
        }
        true
    }

    /// Undo the most recent add of this session, if it happened today.
    pub fn undo_last_add(&mut self) -> bool {
        let Some(last) = self.last_add.take() else {
            return false;
        };
        self.remove_units(&last.habit_id, last.count, last.date)
    }

    /// Record a bad-habit tap for today. Returns false when the pair already
    /// has an active tap or the bad habit is unknown/archived.
    pub fn tap_bad_habit(&mut self, bad_habit_id: &str) -> bool {
        let now = Utc::now();
        let date = self.today();
        if !self.engine.tap_bad_habit(&mut self.store, bad_habit_id, date, now) {
            return false;
        }
        let penalty_units = self
            .store
            .active_tap(bad_habit_id, date)
            .map(|e| e.penalty_units)
            .unwrap_or(0);
        self.pending_events.push(Event::BadHabitTapped {
            bad_habit_id: bad_habit_id.to_string(),
            penalty_units,
            date,
            at: now,
        });
        self.persist_penalty_events();
        true
    }

    /// Undo today's active tap for a bad habit. Returns false when none exists.
    pub fn undo_bad_habit_tap(&mut self, bad_habit_id: &str) -> bool {
        let date = self.today();
        if !self.engine.undo_bad_habit_tap(&mut self.store, bad_habit_id, date) {
            return false;
        }
        self.pending_events.push(Event::TapUndone {
            bad_habit_id: bad_habit_id.to_string(),
            date,
            at: Utc::now(),
        });
        self.persist_penalty_events();
        true
    }

    // --- queries exposed to the UI ---

    /// Raw units for a habit today.
    pub fn raw_today(&self, habit_id: &str) -> u32 {
        self.store.raw_units(habit_id, self.today())
    }

    /// Raw units for a habit over the current ISO week.
    pub fn raw_this_week(&self, habit_id: &str) -> u32 {
        self.store.raw_units_in(habit_id, week_range(self.today()))
    }

    /// Raw units for a habit over the current calendar month.
    pub fn raw_this_month(&self, habit_id: &str) -> u32 {
        self.store.raw_units_in(habit_id, month_range(self.today()))
    }

    /// Raw units for a habit over the current calendar year.
    pub fn raw_this_year(&self, habit_id: &str) -> u32 {
        self.store.raw_units_in(habit_id, year_range(self.today()))
    }

    /// This habit's penalty-adjusted unit count for today.
    pub fn effective_today(&self, habit_id: &str) -> u32 {
        self.effective_distribution(self.today())
            .get(habit_id)
            .copied()
            .unwrap_or(0)
    }

    /// The full effective-units distribution for a date.
    pub fn effective_distribution(&self, date: NaiveDate) -> HashMap<String, u32> {
        let habit_ids: Vec<String> = self
            .store
            .habits_on(date)
            .iter()
            .map(|h| h.id.clone())
            .collect();
        distribute(
            &self.store.raw_by_habit(date),
            self.store.raw_total(date),
            self.store.active_penalty(date),
            &habit_ids,
        )
    }

    /// The daily summary for a date.
    pub fn daily_progress(&self, date: NaiveDate) -> DailyProgress {
        daily_progress(&self.store, date)
    }

    /// The daily summary for today.
    pub fn progress_today(&self) -> DailyProgress {
        self.daily_progress(self.today())
    }

    // --- persistence plumbing ---

    fn newest_event_for(&self, habit_id: &str, date: NaiveDate) -> Option<UnitEvent> {
        self.store
            .unit_events()
            .iter()
            .filter(|e| e.habit_id == habit_id && e.date == date)
            .max_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
            .cloned()
    }

    fn mirror_add(&self, event: &UnitEvent) {
        if let Some(sync) = &self.sync {
            if let Err(e) = sync.mirror_add(event) {
                warn!(habit_id = %event.habit_id, error = %e, "sync mirror rejected add; local state kept");
            }
        }
    }

    fn persist_habits(&self) {
        if let Err(e) = self.storage.save_habits(self.store.habits()) {
            warn!(error = %e, "failed to save habits; in-memory state kept");
        }
    }

    fn persist_bad_habits(&self) {
        if let Err(e) = self.storage.save_bad_habits(self.store.bad_habits()) {
            warn!(error = %e, "failed to save bad habits; in-memory state kept");
        }
    }

    fn persist_unit_events(&self) {
        if let Err(e) = self.storage.save_unit_events(self.store.unit_events()) {
            warn!(error = %e, "failed to save unit events; in-memory state kept");
        }
    }

    fn persist_penalty_events(&self) {
        if let Err(e) = self.storage.save_penalty_events(self.store.penalty_events()) {
            warn!(error = %e, "failed to save penalty events; in-memory state kept");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone};

    fn session() -> LedgerSession {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        LedgerSession::load(LedgerConfig::default(), Box::new(MemoryStorage::new()), now).unwrap()
    }

    #[test]
    fn test_habit_quota_caps_creation() {
        let config = LedgerConfig {
            habit_quota: Some(2),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let mut s = LedgerSession::load(config, Box::new(MemoryStorage::new()), now).unwrap();

        s.create_habit("A", 10, 1).unwrap();
        let kept = s.create_habit("B", 10, 1).unwrap();
        assert!(matches!(
            s.create_habit("C", 10, 1),
            Err(RegistryError::QuotaExceeded(2))
        ));

        // Archiving frees a slot
        s.set_habit_archived(&kept.id, true).unwrap();
        assert!(s.create_habit("C", 10, 1).is_ok());
    }

    #[test]
    fn test_tap_habit_logs_increment_and_signals_goal() {
        let mut s = session();
        let habit = s.create_habit("Water", 8, 4).unwrap();

        s.tap_habit(&habit.id).unwrap();
        let outcome = s.tap_habit(&habit.id).unwrap();
        assert_eq!(outcome.new_total, 8);
        assert!(outcome.goal_reached);

        let events = s.drain_events();
        let goals: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::GoalReached { .. }))
            .collect();
        assert_eq!(goals.len(), 1);
    }

    #[test]
    fn test_undo_last_add_reverts_and_is_single_shot() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        s.add_units(&habit.id, 5, s.today()).unwrap();
        s.add_units(&habit.id, 3, s.today()).unwrap();

        assert!(s.undo_last_add());
        assert_eq!(s.raw_today(&habit.id), 5);
        assert!(!s.undo_last_add());
    }

    #[test]
    fn test_day_rollover_clears_undo_state() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        s.add_units(&habit.id, 5, s.today()).unwrap();

        let next_day = Utc.with_ymd_and_hms(2024, 3, 6, 0, 5, 0).unwrap();
        let rolled = s.checkpoint_day(next_day);
        assert_eq!(rolled, Some(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()));
        assert!(!s.undo_last_add());

        // Second checkpoint on the same day is quiet
        assert_eq!(s.checkpoint_day(next_day + Duration::hours(1)), None);
    }

    #[test]
    fn test_store_snapshot_is_consistent_after_mutation() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        s.add_units(&habit.id, 5, s.today()).unwrap();

        let snapshot = s.store().clone();
        assert_eq!(snapshot.raw_units(&habit.id, s.today()), 5);
    }

    #[test]
    fn test_effective_today_reflects_taps() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        let bad = s.create_bad_habit("Doomscroll");
        s.add_units(&habit.id, 40, s.today()).unwrap();

        assert!(s.tap_bad_habit(&bad.id));
        assert_eq!(s.effective_today(&habit.id), 36);
        assert!(s.progress_today().has_bad_habits);

        assert!(s.undo_bad_habit_tap(&bad.id));
        assert_eq!(s.effective_today(&habit.id), 40);
        assert!(s.progress_today().perfect_day);
    }

    #[test]
    fn test_delete_habit_drops_events_and_persists() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        s.add_units(&habit.id, 5, s.today()).unwrap();

        assert!(s.delete_habit(&habit.id));
        assert!(s.store().unit_events().is_empty());
        assert!(!s.delete_habit(&habit.id));
    }

    #[test]
    fn test_period_totals() {
        let mut s = session();
        let habit = s.create_habit("Run", 10, 1).unwrap();
        let today = s.today(); // 2024-03-05, a Tuesday
        s.add_units(&habit.id, 5, today).unwrap();
        s.add_units(&habit.id, 3, today - Duration::days(1)).unwrap(); // Monday, same week
        s.add_units(&habit.id, 7, today - Duration::days(10)).unwrap(); // February

        assert_eq!(s.raw_today(&habit.id), 5);
        assert_eq!(s.raw_this_week(&habit.id), 8);
        assert_eq!(s.raw_this_month(&habit.id), 8);
        assert_eq!(s.raw_this_year(&habit.id), 15);
    }
}
