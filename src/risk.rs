// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Risk classification
//!
//! This module maps an animal's situation (distance to the forest, distance
//! to the nearest predator sighting, time of day) to a [`RiskLabel`].
//!
//! Two strategies implement [`RiskPolicy`]:
//!
//! - [`ProximityRule`]: binary, `High` under the proximity radius, else `Low`.
//!   Used by the movement simulator.
//! - [`LearnedPolicy`]: a trained random forest. Used by the dashboard.
//!   Degrades to [`RiskOutcome::Unavailable`] when no model is loaded.

use crate::error::ModelError;
use crate::model::RiskModel;
use crate::proximity::HIGH_RISK_RADIUS_M;
use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Risk category, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "very high")]
    VeryHigh,
}

impl RiskLabel {
    /// All labels, least severe first
    pub const ALL: [RiskLabel; 4] = [
        RiskLabel::Low,
        RiskLabel::Medium,
        RiskLabel::High,
        RiskLabel::VeryHigh,
    ];

    /// Wire name (`"very high"` etc.)
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "low",
            RiskLabel::Medium => "medium",
            RiskLabel::High => "high",
            RiskLabel::VeryHigh => "very high",
        }
    }

    /// Next label up, saturating at `VeryHigh`
    pub fn escalate(self) -> Self {
        match self {
            RiskLabel::Low => RiskLabel::Medium,
            RiskLabel::Medium => RiskLabel::High,
            RiskLabel::High | RiskLabel::VeryHigh => RiskLabel::VeryHigh,
        }
    }

    /// Index in [`RiskLabel::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLabel::Low),
            "medium" => Ok(RiskLabel::Medium),
            "high" => Ok(RiskLabel::High),
            "very high" | "very_high" => Ok(RiskLabel::VeryHigh),
            _ => Err(ModelError::UnknownRiskLabel(s.to_string())),
        }
    }
}

/// Coarse time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// All buckets
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Bucket an hour of day (0-23).
    ///
    /// morning [5,12), afternoon [12,17), evening [17,20), night otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=19 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    /// Bucket for the local wall clock
    pub fn current() -> Self {
        Self::from_hour(Local::now().hour())
    }

    /// Encoder class name
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }

    /// Evening and night raise predator risk
    pub fn is_dark(&self) -> bool {
        matches!(self, TimeOfDay::Evening | TimeOfDay::Night)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            _ => Err(ModelError::UnseenLabel(s.to_string())),
        }
    }
}

/// Classifier inputs for one animal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFeatures {
    /// Distance to the forest reference point (meters)
    pub distance_to_forest_m: f64,
    /// Distance to the nearest predator sighting (meters)
    pub distance_to_predator_m: f64,
    /// Time-of-day bucket
    pub time_of_day: TimeOfDay,
}

impl RiskFeatures {
    /// Create a feature set
    pub fn new(distance_to_forest_m: f64, distance_to_predator_m: f64, time_of_day: TimeOfDay) -> Self {
        Self {
            distance_to_forest_m,
            distance_to_predator_m,
            time_of_day,
        }
    }
}

/// Result of a classification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RiskOutcome {
    /// A risk label was produced
    Label(RiskLabel),
    /// No model loaded
    Unavailable,
    /// Features could not be encoded
    Error(String),
}

impl RiskOutcome {
    /// Label, if one was produced
    pub fn label(&self) -> Option<RiskLabel> {
        match self {
            RiskOutcome::Label(label) => Some(*label),
            _ => None,
        }
    }

    /// Display name: the label, `"N/A"` or `"Error"`
    pub fn display_name(&self) -> &'static str {
        match self {
            RiskOutcome::Label(label) => label.as_str(),
            RiskOutcome::Unavailable => "N/A",
            RiskOutcome::Error(_) => "Error",
        }
    }

    /// Does this outcome call for an alert on its own?
    pub fn is_alerting(&self) -> bool {
        self.label().is_some_and(|l| l >= RiskLabel::High)
    }
}

impl fmt::Display for RiskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_name())
    }
}

/// Strategy mapping features to a risk outcome
pub trait RiskPolicy {
    /// Classify one animal's situation
    fn assess(&self, features: &RiskFeatures) -> RiskOutcome;

    /// Short policy name for logs
    fn name(&self) -> &'static str;
}

/// Binary proximity rule: `High` under `radius_m`, else `Low`.
///
/// Forest distance and time of day are ignored.
#[derive(Debug, Clone, Copy)]
pub struct ProximityRule {
    pub radius_m: f64,
}

impl Default for ProximityRule {
    fn default() -> Self {
        Self {
            radius_m: HIGH_RISK_RADIUS_M,
        }
    }
}

impl RiskPolicy for ProximityRule {
    fn assess(&self, features: &RiskFeatures) -> RiskOutcome {
        if features.distance_to_predator_m < self.radius_m {
            RiskOutcome::Label(RiskLabel::High)
        } else {
            RiskOutcome::Label(RiskLabel::Low)
        }
    }

    fn name(&self) -> &'static str {
        "proximity-rule"
    }
}

/// Trained random forest policy.
#[derive(Debug, Clone, Default)]
pub struct LearnedPolicy {
    model: Option<RiskModel>,
}

impl LearnedPolicy {
    /// Wrap a loaded model
    pub fn new(model: RiskModel) -> Self {
        Self { model: Some(model) }
    }

    /// Policy with no model; every prediction is `Unavailable`
    pub fn unavailable() -> Self {
        Self { model: None }
    }

    /// Load artifacts from `dir`, degrading to [`LearnedPolicy::unavailable`]
    /// when they are missing or unreadable.
    pub fn load_or_degrade(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        match RiskModel::load(dir) {
            Ok(model) => {
                log::info!("Risk model loaded from {}", dir.display());
                Self::new(model)
            }
            Err(e) => {
                log::error!(
                    "Risk model unavailable ({}); predictions will be N/A",
                    e
                );
                Self::unavailable()
            }
        }
    }

    /// Is a model loaded?
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Underlying model
    pub fn model(&self) -> Option<&RiskModel> {
        self.model.as_ref()
    }

    /// Predict from raw features with a free-form time bucket.
    pub fn predict(&self, dist_forest: f64, dist_predator: f64, time_bucket: &str) -> RiskOutcome {
        let Some(model) = &self.model else {
            return RiskOutcome::Unavailable;
        };
        match model.predict(dist_forest, dist_predator, time_bucket) {
            Ok(label) => RiskOutcome::Label(label),
            Err(e) => {
                log::error!("Prediction error: {}", e);
                RiskOutcome::Error(e.to_string())
            }
        }
    }
}

impl RiskPolicy for LearnedPolicy {
    fn assess(&self, features: &RiskFeatures) -> RiskOutcome {
        self.predict(
            features.distance_to_forest_m,
            features.distance_to_predator_m,
            features.time_of_day.as_str(),
        )
    }

    fn name(&self) -> &'static str {
        "learned"
    }
}
