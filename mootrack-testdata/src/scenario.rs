// MooTrack Testdata - Farm scenarios
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Farm scenario presets: pasture location, forest zone and seeded
//! predator sightings.
//!
//! A scenario can be written into any [`DocumentStore`] to give the
//! simulator and dashboard something to work against.

use chrono::{DateTime, Utc};
use mootrack::store::seed_sighting_once;
use mootrack::{Coordinate, DocumentStore, GeoError, Sighting, StoreError, Zone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors while building or applying a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario geometry: {0}")]
    Geometry(#[from] GeoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A predator sighting to seed, described without a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingPreset {
    pub predator_id: String,
    /// `[lon, lat]`
    pub location: [f64; 2],
    pub risk_level: String,
    pub notes: String,
}

impl SightingPreset {
    /// Build the sighting stamped at `timestamp`.
    pub fn to_sighting(&self, timestamp: DateTime<Utc>) -> Result<Sighting, ScenarioError> {
        let coordinate = Coordinate::new(self.location[0], self.location[1])?;
        Ok(Sighting::new(self.predator_id.clone(), timestamp, coordinate)
            .with_risk_level(self.risk_level.clone())
            .with_notes(self.notes.clone()))
    }
}

/// Farm scenario definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmScenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Pasture center `[lon, lat]`.
    pub base: [f64; 2],
    /// Forest zone name.
    pub zone_name: String,
    /// Forest zone ring, `[lon, lat]` pairs.
    pub zone_ring: Vec<[f64; 2]>,
    /// Sightings to insert once.
    pub sightings: Vec<SightingPreset>,
}

/// What applying a scenario changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub zone_written: bool,
    pub sightings_inserted: usize,
    pub sightings_skipped: usize,
}

impl FarmScenario {
    /// Pasture next to a forest patch with one leopard seen at its edge.
    pub fn forest_edge() -> Self {
        Self {
            name: "forest_edge".to_string(),
            description: "Herd grazing beside a forest patch with a recent leopard sighting".to_string(),
            base: [74.846, 13.635],
            zone_name: "Western Ghats Patch".to_string(),
            zone_ring: vec![
                [74.8440, 13.6340],
                [74.8475, 13.6335],
                [74.8490, 13.6360],
                [74.8470, 13.6385],
                [74.8445, 13.6375],
                [74.8440, 13.6340],
            ],
            sightings: vec![SightingPreset {
                predator_id: "LEO_SYNTH001".to_string(),
                location: [74.8465, 13.6355],
                risk_level: "HIGH".to_string(),
                notes: "Test leopard inserted".to_string(),
            }],
        }
    }

    /// Open grazing land with the forest and predators well away.
    pub fn open_pasture() -> Self {
        Self {
            name: "open_pasture".to_string(),
            description: "Herd on open pasture, forest and sightings several kilometers away".to_string(),
            base: [74.800, 13.000],
            zone_name: "Distant Forest".to_string(),
            zone_ring: vec![
                [74.850, 13.050],
                [74.870, 13.050],
                [74.870, 13.070],
                [74.850, 13.070],
            ],
            sightings: vec![SightingPreset {
                predator_id: "LEO_SYNTH002".to_string(),
                location: [74.865, 13.060],
                risk_level: "LOW".to_string(),
                notes: "Old sighting deep in the forest".to_string(),
            }],
        }
    }

    /// All built-in scenarios.
    pub fn presets() -> Vec<Self> {
        vec![Self::forest_edge(), Self::open_pasture()]
    }

    /// Look up a built-in scenario by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::presets().into_iter().find(|s| s.name == name)
    }

    /// Pasture center as a coordinate.
    pub fn base_coordinate(&self) -> Result<Coordinate, ScenarioError> {
        Ok(Coordinate::new(self.base[0], self.base[1])?)
    }

    /// Build the forest zone.
    pub fn zone(&self) -> Result<Zone, ScenarioError> {
        let ring = self
            .zone_ring
            .iter()
            .map(|p| Coordinate::new(p[0], p[1]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Zone::new(self.zone_name.clone(), ring)?)
    }

    /// Write the zone and insert each sighting that is not already stored.
    pub fn apply(&self, store: &dyn DocumentStore, now: DateTime<Utc>) -> Result<SeedReport, ScenarioError> {
        let mut report = SeedReport::default();

        store.set_zone(&self.zone()?)?;
        report.zone_written = true;

        for preset in &self.sightings {
            if seed_sighting_once(store, &preset.to_sighting(now)?)? {
                report.sightings_inserted += 1;
            } else {
                report.sightings_skipped += 1;
            }
        }

        Ok(report)
    }

    /// Load a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the scenario to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
