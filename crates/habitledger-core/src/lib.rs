//! # HabitLedger Core Library
//!
//! This library provides the core business logic for HabitLedger, a personal
//! habit-tracking client: the effort ledger and the penalty-distribution
//! engine. UI layers are thin hosts over this crate; screens, gestures, and
//! persistence adapters live outside it.
//!
//! ## Architecture
//!
//! - **Event Store**: append-only unit/penalty event collections plus the
//!   habit registries, with pure derived queries
//! - **Mutation Engine**: validated add/remove/tap/undo, LIFO removal,
//!   at-tap-time penalty capture
//! - **Penalty Distribution**: a pure fair-split function turning raw totals
//!   and the day's penalty into per-habit effective totals that conserve the
//!   day's sum exactly
//! - **Daily Progress**: the single summary the UI renders
//!
//! ## Key Components
//!
//! - [`LedgerSession`]: host-facing facade over store, engine, and storage
//! - [`EventStore`]: snapshot value holding all tracked state
//! - [`distribute`]: the penalty-distribution function
//! - [`DailyProgress`]: the daily summary

pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
pub mod habit;
pub mod ledger;
pub mod mutation;
pub mod penalty;
pub mod progress;
pub mod session;
pub mod storage;
pub mod store;

pub use calendar::{day_key, month_range, week_range, year_range, DateRange, DayTracker};
pub use config::LedgerConfig;
pub use error::{AddUnitsError, RegistryError, StorageError};
pub use events::Event;
pub use habit::{BadHabit, Habit, MAX_TAP_INCREMENT};
pub use ledger::{PenaltyEvent, UnitEvent};
pub use mutation::{AddOutcome, MutationEngine, QuotaGate, Unmetered};
pub use penalty::distribute;
pub use progress::{daily_progress, DailyProgress, HabitProgress};
pub use session::LedgerSession;
pub use storage::{HabitStorage, JsonFileStorage, MemoryStorage, SyncMirror};
pub use store::EventStore;
