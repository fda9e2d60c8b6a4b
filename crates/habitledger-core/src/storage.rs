//! Persistence and sync collaborators.
//!
//! The engine never mandates a storage technology; it talks to whatever
//! implements [`HabitStorage`]. Saves are fire-and-forget from the session's
//! point of view: a failed save is logged and in-memory state stays
//! authoritative. [`JsonFileStorage`] is the bundled reference collaborator;
//! [`MemoryStorage`] backs tests and ephemeral hosts.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::habit::{BadHabit, Habit};
use crate::ledger::{PenaltyEvent, UnitEvent};

/// Persistence collaborator. Load is pull-on-start, save is push-after-mutation.
pub trait HabitStorage {
    fn load_habits(&self) -> Result<Vec<Habit>>;
    fn load_bad_habits(&self) -> Result<Vec<BadHabit>>;
    fn load_unit_events(&self) -> Result<Vec<UnitEvent>>;
    fn load_penalty_events(&self) -> Result<Vec<PenaltyEvent>>;

    fn save_habits(&self, habits: &[Habit]) -> Result<()>;
    fn save_bad_habits(&self, bad_habits: &[BadHabit]) -> Result<()>;
    fn save_unit_events(&self, events: &[UnitEvent]) -> Result<()>;
    fn save_penalty_events(&self, events: &[PenaltyEvent]) -> Result<()>;
}

/// Optional remote mirror for add/remove events. Failures are swallowed by
/// the caller; the local store remains authoritative.
pub trait SyncMirror {
    fn mirror_add(&self, event: &UnitEvent) -> Result<()>;
    fn mirror_remove(&self, habit_id: &str, count: u32, date: chrono::NaiveDate) -> Result<()>;
}

/// In-memory storage for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Snapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    habits: Vec<Habit>,
    #[serde(default)]
    bad_habits: Vec<BadHabit>,
    #[serde(default)]
    unit_events: Vec<UnitEvent>,
    #[serde(default)]
    penalty_events: Vec<PenaltyEvent>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HabitStorage for MemoryStorage {
    fn load_habits(&self) -> Result<Vec<Habit>> {
        Ok(self.inner.lock().unwrap().habits.clone())
    }

    fn load_bad_habits(&self) -> Result<Vec<BadHabit>> {
        Ok(self.inner.lock().unwrap().bad_habits.clone())
    }

    fn load_unit_events(&self) -> Result<Vec<UnitEvent>> {
        Ok(self.inner.lock().unwrap().unit_events.clone())
    }

    fn load_penalty_events(&self) -> Result<Vec<PenaltyEvent>> {
        Ok(self.inner.lock().unwrap().penalty_events.clone())
    }

    fn save_habits(&self, habits: &[Habit]) -> Result<()> {
        self.inner.lock().unwrap().habits = habits.to_vec();
        Ok(())
    }

    fn save_bad_habits(&self, bad_habits: &[BadHabit]) -> Result<()> {
        self.inner.lock().unwrap().bad_habits = bad_habits.to_vec();
        Ok(())
    }

    fn save_unit_events(&self, events: &[UnitEvent]) -> Result<()> {
        self.inner.lock().unwrap().unit_events = events.to_vec();
        Ok(())
    }

    fn save_penalty_events(&self, events: &[PenaltyEvent]) -> Result<()> {
        self.inner.lock().unwrap().penalty_events = events.to_vec();
        Ok(())
    }
}

/// Single JSON file holding all four collections.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| StorageError::ParseFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let text = serde_json::to_string_pretty(snapshot).map_err(|e| StorageError::ParseFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, text).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn update(&self, apply: impl FnOnce(&mut Snapshot)) -> Result<()> {
        let mut snapshot = self.read()?;
        apply(&mut snapshot);
        self.write(&snapshot)
    }
}

impl HabitStorage for JsonFileStorage {
    fn load_habits(&self) -> Result<Vec<Habit>> {
        Ok(self.read()?.habits)
    }

    fn load_bad_habits(&self) -> Result<Vec<BadHabit>> {
        Ok(self.read()?.bad_habits)
    }

    fn load_unit_events(&self) -> Result<Vec<UnitEvent>> {
        Ok(self.read()?.unit_events)
    }

    fn load_penalty_events(&self) -> Result<Vec<PenaltyEvent>> {
        Ok(self.read()?.penalty_events)
    }

    fn save_habits(&self, habits: &[Habit]) -> Result<()> {
        self.update(|s| s.habits = habits.to_vec())
    }

    fn save_bad_habits(&self, bad_habits: &[BadHabit]) -> Result<()> {
        self.update(|s| s.bad_habits = bad_habits.to_vec())
    }

    fn save_unit_events(&self, events: &[UnitEvent]) -> Result<()> {
        self.update(|s| s.unit_events = events.to_vec())
    }

    fn save_penalty_events(&self, events: &[PenaltyEvent]) -> Result<()> {
        self.update(|s| s.penalty_events = events.to_vec())
    }
}
