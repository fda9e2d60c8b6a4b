//! Core error types for habitledger-core.
//!
//! The taxonomy is deliberately small and all-local: operations either
//! succeed, are documented no-ops, or fail with one of these variants.
//! "Nothing matched" cases (remove with no events, undo with no active tap)
//! are `bool` returns on the engine, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failure modes for logging units against a habit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddUnitsError {
    /// The habit id is not in the registry
    #[error("habit not found: {0}")]
    HabitNotFound(String),

    /// The habit exists but is archived
    #[error("habit is archived: {0}")]
    HabitArchived(String),

    /// A caller-supplied entitlement gate rejected the add
    #[error("quota exceeded for habit {0}")]
    QuotaExceeded(String),
}

/// Failure modes for registry operations on the session facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The habit id is not in the registry
    #[error("habit not found: {0}")]
    HabitNotFound(String),

    /// The bad habit id is not in the registry
    #[error("bad habit not found: {0}")]
    BadHabitNotFound(String),

    /// Creating another habit would exceed the configured quota
    #[error("habit quota of {0} reached")]
    QuotaExceeded(u32),
}

/// Failure modes for configuration and file-backed storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored payload did not parse
    #[error("failed to parse {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },
}

/// Result type alias for storage operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
