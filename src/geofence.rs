// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Forest-zone containment checks.
//!
//! A [`Zone`] is a single polygon ring. Two containment modes exist:
//!
//! - [`ContainmentMode::BoundingBox`]: inclusive axis-aligned box over the
//!   vertex longitudes/latitudes. Cheap, but over-reports for any
//!   non-rectangular forest.
//! - [`ContainmentMode::Polygon`]: ray casting against the ring (default).
//!
//! Rings are treated as planar in lon/lat space, which is adequate for
//! farm-scale zones that do not cross the antimeridian.

use crate::error::GeoError;
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};

/// Distance to the forest reported when no zone is configured.
pub const NO_ZONE_DISTANCE_M: f64 = f64::INFINITY;

/// Meters from `point` to the zone centroid, [`NO_ZONE_DISTANCE_M`] without a zone.
pub fn distance_to_forest(point: &Coordinate, zone: Option<&Zone>) -> f64 {
    zone.map(|z| point.distance_to(&z.centroid()))
        .unwrap_or(NO_ZONE_DISTANCE_M)
}

/// How [`Zone::contains`] decides containment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentMode {
    /// Inclusive bounding box over the ring vertices
    BoundingBox,
    /// True point-in-polygon (ray casting)
    #[default]
    Polygon,
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Inclusive containment test
    pub fn contains(&self, point: &Coordinate) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.lon())
            && (self.min_lat..=self.max_lat).contains(&point.lat())
    }
}

/// A named forest polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    name: String,
    ring: Vec<Coordinate>,
}

impl Zone {
    /// Build a zone from an ordered ring.
    ///
    /// A trailing vertex equal to the first one (GeoJSON closed ring) is
    /// dropped. At least 3 distinct vertices must remain.
    pub fn new(name: impl Into<String>, mut ring: Vec<Coordinate>) -> Result<Self, GeoError> {
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        let mut distinct: Vec<&Coordinate> = Vec::with_capacity(ring.len());
        for vertex in &ring {
            if !distinct.contains(&vertex) {
                distinct.push(vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(GeoError::DegenerateZone {
                count: distinct.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            ring,
        })
    }

    /// Zone name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open ring (closing vertex not repeated)
    pub fn vertices(&self) -> &[Coordinate] {
        &self.ring
    }

    /// Ring closed GeoJSON-style (first vertex repeated at the end)
    pub fn closed_ring(&self) -> Vec<Coordinate> {
        let mut ring = self.ring.clone();
        if let Some(first) = self.ring.first() {
            ring.push(*first);
        }
        ring
    }

    /// Bounding box over the vertices
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for v in &self.ring {
            bbox.min_lon = bbox.min_lon.min(v.lon());
            bbox.max_lon = bbox.max_lon.max(v.lon());
            bbox.min_lat = bbox.min_lat.min(v.lat());
            bbox.max_lat = bbox.max_lat.max(v.lat());
        }
        bbox
    }

    /// Arithmetic mean of the vertices.
    ///
    /// This is the reference point for the distance-to-forest feature.
    pub fn centroid(&self) -> Coordinate {
        let n = self.ring.len() as f64;
        let lon = self.ring.iter().map(|v| v.lon()).sum::<f64>() / n;
        let lat = self.ring.iter().map(|v| v.lat()).sum::<f64>() / n;
        Coordinate::clamped(lon, lat)
    }

    /// Containment test in the given mode
    pub fn contains(&self, point: &Coordinate, mode: ContainmentMode) -> bool {
        match mode {
            ContainmentMode::BoundingBox => self.bounding_box().contains(point),
            ContainmentMode::Polygon => point_in_ring(point, &self.ring),
        }
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_ring(point: &Coordinate, ring: &[Coordinate]) -> bool {
    let (px, py) = (point.lon(), point.lat());
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lon(), ring[i].lat());
        let (xj, yj) = (ring[j].lon(), ring[j].lat());
        if (yi > py) != (yj > py) {
            let intersect_x = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Containment checker bound to a mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geofence {
    mode: ContainmentMode,
}

impl Geofence {
    /// Create a checker using the given mode
    pub fn new(mode: ContainmentMode) -> Self {
        Self { mode }
    }

    /// Configured mode
    pub fn mode(&self) -> ContainmentMode {
        self.mode
    }

    /// Is `point` inside `zone`? `false` (with a warning) when no zone is configured.
    pub fn contains(&self, point: &Coordinate, zone: Option<&Zone>) -> bool {
        match zone {
            Some(zone) => zone.contains(point, self.mode),
            None => {
                log::warn!("No forest zone configured; containment check skipped");
                false
            }
        }
    }
}
