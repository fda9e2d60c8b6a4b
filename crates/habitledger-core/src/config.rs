//! TOML-based ledger configuration.
//!
//! Tuning knobs for the engine: the penalty rate captured at tap time, the
//! per-event unit ceiling, and the optional habit-creation quota. All fields
//! default individually so a partial config file still parses.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

fn default_penalty_rate() -> f64 {
    0.10
}

fn default_max_units_per_event() -> u32 {
    500
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Fraction of the remaining effective total a bad-habit tap subtracts,
    /// captured at tap time. Clamped into [0.0, 1.0] on load.
    #[serde(default = "default_penalty_rate")]
    pub penalty_rate: f64,

    /// Ceiling applied to the count of a single add operation.
    #[serde(default = "default_max_units_per_event")]
    pub max_units_per_event: u32,

    /// Maximum number of habits the session will create; `None` is unlimited.
    /// Entitlement gating beyond this simple cap is the caller's concern.
    #[serde(default)]
    pub habit_quota: Option<u32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            penalty_rate: default_penalty_rate(),
            max_units_per_event: default_max_units_per_event(),
            habit_quota: None,
        }
    }
}

impl LedgerConfig {
    /// Load from a TOML file, applying field defaults for missing keys and
    /// clamping out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: LedgerConfig =
            toml::from_str(&text).map_err(|e| StorageError::ParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.penalty_rate = config.penalty_rate.clamp(0.0, 1.0);
        config.max_units_per_event = config.max_units_per_event.max(1);
        Ok(config)
    }

    /// Save as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| StorageError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
