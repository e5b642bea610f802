// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Map view
//!
//! A [`Dashboard`] pass fetches the latest positions, sightings and zone,
//! classifies every animal and returns a [`MapView`]. Each call is a fresh
//! fetch-compute-render pass with no state kept between calls.

use crate::error::StoreError;
use crate::geo::Coordinate;
use crate::geofence::{Geofence, Zone, NO_ZONE_DISTANCE_M};
use crate::proximity::{self, HIGH_RISK_RADIUS_M};
use crate::record::Sighting;
use crate::risk::{RiskFeatures, RiskLabel, RiskOutcome, RiskPolicy, TimeOfDay};
use crate::store::{latest_per_entity, DocumentStore};
use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Number of position documents fetched, newest first
    pub position_limit: usize,
    /// Collapse the fetched documents to one (newest) per animal
    pub latest_per_entity: bool,
    /// Danger circle drawn around each sighting (meters)
    pub danger_radius_m: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            position_limit: 10,
            latest_per_entity: true,
            danger_radius_m: HIGH_RISK_RADIUS_M,
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position_limit(mut self, limit: usize) -> Self {
        self.position_limit = limit;
        self
    }

    pub fn with_latest_per_entity(mut self, on: bool) -> Self {
        self.latest_per_entity = on;
        self
    }
}

/// Marker colour by risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Orange,
    Green,
    Blue,
}

impl MarkerColor {
    /// red for high / very high, orange for medium, green for low, blue otherwise
    pub fn for_outcome(outcome: &RiskOutcome) -> Self {
        match outcome.label() {
            Some(RiskLabel::High | RiskLabel::VeryHigh) => MarkerColor::Red,
            Some(RiskLabel::Medium) => MarkerColor::Orange,
            Some(RiskLabel::Low) => MarkerColor::Green,
            None => MarkerColor::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Orange => "orange",
            MarkerColor::Green => "green",
            MarkerColor::Blue => "blue",
        }
    }
}

fn finite_or_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

fn outcome_name<S: Serializer>(outcome: &RiskOutcome, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(outcome.display_name())
}

/// One animal on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMarker {
    pub entity_id: String,
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "outcome_name")]
    pub risk: RiskOutcome,
    pub in_forest: bool,
    #[serde(serialize_with = "finite_or_null")]
    pub distance_to_forest_m: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub distance_to_predator_m: f64,
    pub color: MarkerColor,
}

/// One sighting with its danger circle
#[derive(Debug, Clone, PartialEq)]
pub struct SightingMarker {
    pub sighting: Sighting,
    pub radius_m: f64,
}

/// Count per risk display name (`low` ... `very high`, `N/A`, `Error`)
pub type RiskSummary = BTreeMap<String, usize>;

/// Result of one dashboard pass
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Newest animal position, `None` when nothing is tracked
    pub center: Option<Coordinate>,
    pub zone: Option<Zone>,
    pub sightings: Vec<SightingMarker>,
    pub markers: Vec<EntityMarker>,
    pub summary: RiskSummary,
    pub time_of_day: TimeOfDay,
    pub generated_at: DateTime<Utc>,
}

impl MapView {
    /// Number of animals with the given outcome name
    pub fn count(&self, name: &str) -> usize {
        self.summary.get(name).copied().unwrap_or(0)
    }

    /// GeoJSON `FeatureCollection`. `center`, `summary` and `time_of_day`
    /// are carried as foreign members.
    pub fn to_geojson(&self) -> Value {
        let mut features = Vec::new();

        if let Some(zone) = &self.zone {
            features.push(json!({
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [zone.closed_ring()]},
                "properties": {"kind": "forest_zone", "name": zone.name()},
            }));
        }

        for marker in &self.sightings {
            let s = &marker.sighting;
            features.push(json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": s.coordinate},
                "properties": {
                    "kind": "sighting",
                    "predator_id": s.predator_id,
                    "timestamp": s.timestamp,
                    "risk_level": s.risk_level,
                    "notes": s.notes,
                    "danger_radius_m": marker.radius_m,
                },
            }));
        }

        for marker in &self.markers {
            let mut properties = serde_json::to_value(marker).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut properties {
                map.remove("coordinate");
                map.insert("kind".to_string(), json!("entity"));
            }
            features.push(json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": marker.coordinate},
                "properties": properties,
            }));
        }

        json!({
            "type": "FeatureCollection",
            "features": features,
            "center": self.center,
            "summary": self.summary,
            "time_of_day": self.time_of_day,
            "generated_at": self.generated_at,
        })
    }
}

/// Produces [`MapView`]s from a store and a risk policy
pub struct Dashboard {
    store: Arc<dyn DocumentStore>,
    policy: Box<dyn RiskPolicy + Send + Sync>,
    geofence: Geofence,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: Box<dyn RiskPolicy + Send + Sync>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            store,
            policy,
            geofence: Geofence::default(),
            config,
        }
    }

    /// Replace the containment checker
    pub fn with_geofence(mut self, geofence: Geofence) -> Self {
        self.geofence = geofence;
        self
    }

    /// Policy name, for status output
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// One pass at the current time
    pub fn render(&self) -> Result<MapView, StoreError> {
        self.render_at(Utc::now())
    }

    /// One pass, bucketing time of day from `now` (local hour)
    pub fn render_at(&self, now: DateTime<Utc>) -> Result<MapView, StoreError> {
        let mut positions = self.store.recent_positions(self.config.position_limit)?;
        if self.config.latest_per_entity {
            positions = latest_per_entity(&positions);
        }
        let sightings = self.store.sightings()?;
        let zone = self.store.zone()?;
        let forest_center = zone.as_ref().map(Zone::centroid);
        let time_of_day = TimeOfDay::from_hour(now.with_timezone(&Local).hour());

        let mut summary = RiskSummary::new();
        let markers: Vec<EntityMarker> = positions
            .iter()
            .map(|p| {
                let distance_to_forest_m = forest_center
                    .map(|c| p.coordinate.distance_to(&c))
                    .unwrap_or(NO_ZONE_DISTANCE_M);
                let distance_to_predator_m = proximity::nearest_distance(&p.coordinate, &sightings);
                let features =
                    RiskFeatures::new(distance_to_forest_m, distance_to_predator_m, time_of_day);
                let risk = self.policy.assess(&features);
                *summary.entry(risk.display_name().to_string()).or_insert(0) += 1;

                EntityMarker {
                    entity_id: p.entity_id.clone(),
                    coordinate: p.coordinate,
                    timestamp: p.timestamp,
                    in_forest: self.geofence.contains(&p.coordinate, zone.as_ref()),
                    color: MarkerColor::for_outcome(&risk),
                    risk,
                    distance_to_forest_m,
                    distance_to_predator_m,
                }
            })
            .collect();

        log::debug!(
            "Dashboard pass: {} animals, {} sightings, zone {}",
            markers.len(),
            sightings.len(),
            if zone.is_some() { "loaded" } else { "missing" }
        );

        Ok(MapView {
            center: markers.first().map(|m| m.coordinate),
            sightings: sightings
                .into_iter()
                .map(|sighting| SightingMarker {
                    sighting,
                    radius_m: self.config.danger_radius_m,
                })
                .collect(),
            zone,
            markers,
            summary,
            time_of_day,
            generated_at: now,
        })
    }
}
