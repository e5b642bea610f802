// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Top-level configuration
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables, then by CLI flags. Every field has a default, so a partial file
//! is fine:
//!
//! ```json
//! { "store_dir": "/var/lib/mootrack", "simulation": { "herd_size": 25 } }
//! ```
//!
//! SMS credentials are never read from the file; see [`crate::notify`].

use crate::dashboard::DashboardConfig;
use crate::error::ConfigError;
use crate::geofence::ContainmentMode;
use crate::model::TrainingConfig;
use crate::notify::ENV_RECIPIENT;
use crate::simulator::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store directory variable
pub const ENV_STORE_DIR: &str = "MOOTRACK_STORE_DIR";
/// Model directory variable
pub const ENV_MODEL_DIR: &str = "MOOTRACK_MODEL_DIR";

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MooTrackConfig {
    /// Document store directory
    pub store_dir: PathBuf,
    /// Model artifact directory
    pub model_dir: PathBuf,
    /// Alert recipient phone number
    pub alert_recipient: Option<String>,
    /// Geofence containment mode
    pub containment: ContainmentMode,
    pub simulation: SimulationConfig,
    pub dashboard: DashboardConfig,
    pub training: TrainingConfig,
}

impl Default for MooTrackConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("mootrack-data"),
            model_dir: PathBuf::from("."),
            alert_recipient: None,
            containment: ContainmentMode::default(),
            simulation: SimulationConfig::default(),
            dashboard: DashboardConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl MooTrackConfig {
    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `MOOTRACK_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env_value(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_value(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(recipient) = env_value(ENV_RECIPIENT) {
            self.alert_recipient = Some(recipient);
        }
        self
    }

    /// Set the store directory
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// Set the model directory
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.herd_size == 0 {
            return Err(invalid("simulation.herd_size", "must be at least 1"));
        }
        if !sim.walk.max_step_deg.is_finite() || sim.walk.max_step_deg < 0.0 {
            return Err(invalid("simulation.walk.max_step_deg", "must be a non-negative number"));
        }
        if !sim.initial_spread_deg.is_finite() || sim.initial_spread_deg < 0.0 {
            return Err(invalid("simulation.initial_spread_deg", "must be a non-negative number"));
        }
        if let Some(b) = &sim.walk.bounds {
            if !(b.min_lon <= b.max_lon && b.min_lat <= b.max_lat) {
                return Err(invalid("simulation.walk.bounds", "min must not exceed max"));
            }
        }
        if self.dashboard.position_limit == 0 {
            return Err(invalid("dashboard.position_limit", "must be at least 1"));
        }
        let fraction = self.training.test_fraction;
        if !(0.0..1.0).contains(&fraction) {
            return Err(invalid("training.test_fraction", "must be in [0, 1)"));
        }
        if self.training.forest.n_trees == 0 {
            return Err(invalid("training.forest.n_trees", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
