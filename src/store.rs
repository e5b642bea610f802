// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Persistence gateway
//!
//! Three collections are kept:
//!
//! | Collection | Document |
//! |------------|----------|
//! | cow locations | `{cow_id, timestamp, location: {type: "Point", coordinates: [lon, lat]}}` |
//! | leopard sightings | `{leopard_id, timestamp, location, risk_level, notes}` |
//! | forest zones | `{name, area: {type: "Polygon", coordinates: [[[lon, lat], ...]]}}` |
//!
//! [`MemoryStore`] keeps them in memory; [`JsonFileStore`] appends JSON lines
//! to files in a directory. Writes are best effort: no transactions, no
//! retries. Records that fail to parse on read are skipped with a warning.

use crate::error::StoreError;
use crate::geo::Coordinate;
use crate::geofence::Zone;
use crate::record::{Position, Sighting};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Position collection file
pub const POSITIONS_FILE: &str = "cow_locations.jsonl";
/// Sighting collection file
pub const SIGHTINGS_FILE: &str = "leopard_sightings.jsonl";
/// Zone file (single active zone)
pub const ZONE_FILE: &str = "forest_zones.json";

/// GeoJSON point geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PointGeometry {
    Point { coordinates: Coordinate },
}

/// GeoJSON polygon geometry (outer ring only is used)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolygonGeometry {
    Polygon { coordinates: Vec<Vec<Coordinate>> },
}

/// Stored form of a [`Position`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDocument {
    pub cow_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: PointGeometry,
}

/// Stored form of a [`Sighting`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SightingDocument {
    pub leopard_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: PointGeometry,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub notes: String,
}

/// Stored form of a [`Zone`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDocument {
    pub name: String,
    pub area: PolygonGeometry,
}

impl From<&Position> for PositionDocument {
    fn from(p: &Position) -> Self {
        Self {
            cow_id: p.entity_id.clone(),
            timestamp: p.timestamp,
            location: PointGeometry::Point {
                coordinates: p.coordinate,
            },
        }
    }
}

impl From<PositionDocument> for Position {
    fn from(doc: PositionDocument) -> Self {
        let PointGeometry::Point { coordinates } = doc.location;
        Position::new(doc.cow_id, doc.timestamp, coordinates)
    }
}

impl From<&Sighting> for SightingDocument {
    fn from(s: &Sighting) -> Self {
        Self {
            leopard_id: s.predator_id.clone(),
            timestamp: s.timestamp,
            location: PointGeometry::Point {
                coordinates: s.coordinate,
            },
            risk_level: s.risk_level.clone(),
            notes: s.notes.clone(),
        }
    }
}

impl From<SightingDocument> for Sighting {
    fn from(doc: SightingDocument) -> Self {
        let PointGeometry::Point { coordinates } = doc.location;
        Sighting::new(doc.leopard_id, doc.timestamp, coordinates)
            .with_risk_level(doc.risk_level)
            .with_notes(doc.notes)
    }
}

impl From<&Zone> for ZoneDocument {
    fn from(z: &Zone) -> Self {
        Self {
            name: z.name().to_string(),
            area: PolygonGeometry::Polygon {
                coordinates: vec![z.closed_ring()],
            },
        }
    }
}

impl TryFrom<ZoneDocument> for Zone {
    type Error = StoreError;

    fn try_from(doc: ZoneDocument) -> Result<Self, Self::Error> {
        let PolygonGeometry::Polygon { coordinates } = doc.area;
        let ring = coordinates
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Invalid(format!("zone {:?} has no ring", doc.name)))?;
        Zone::new(doc.name, ring).map_err(|e| StoreError::Invalid(e.to_string()))
    }
}

/// Document persistence used by the simulator and the dashboard.
pub trait DocumentStore: Send + Sync {
    /// Append a position
    fn insert_position(&self, position: &Position) -> Result<(), StoreError>;

    /// Up to `limit` most recent positions, newest first
    fn recent_positions(&self, limit: usize) -> Result<Vec<Position>, StoreError>;

    /// Append a sighting
    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError>;

    /// All sightings
    fn sightings(&self) -> Result<Vec<Sighting>, StoreError>;

    /// First sighting with the given predator id
    fn find_sighting(&self, predator_id: &str) -> Result<Option<Sighting>, StoreError> {
        Ok(self
            .sightings()?
            .into_iter()
            .find(|s| s.predator_id == predator_id))
    }

    /// Active forest zone, if any
    fn zone(&self) -> Result<Option<Zone>, StoreError>;

    /// Replace the active forest zone
    fn set_zone(&self, zone: &Zone) -> Result<(), StoreError>;
}

/// Newest-first ordering, later insertion winning ties
fn newest_first(mut positions: Vec<Position>, limit: usize) -> Vec<Position> {
    positions.reverse();
    positions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    positions.truncate(limit);
    positions
}

/// Keep the first (newest) position per entity from a newest-first list.
pub fn latest_per_entity(positions: &[Position]) -> Vec<Position> {
    let mut seen = HashSet::new();
    positions
        .iter()
        .filter(|p| seen.insert(p.entity_id.as_str()))
        .cloned()
        .collect()
}

/// Insert `sighting` unless one with the same predator id already exists.
///
/// Returns `true` when it was inserted.
pub fn seed_sighting_once(store: &dyn DocumentStore, sighting: &Sighting) -> Result<bool, StoreError> {
    if store.find_sighting(&sighting.predator_id)?.is_some() {
        log::debug!("Sighting {} already present", sighting.predator_id);
        return Ok(false);
    }
    store.insert_sighting(sighting)?;
    log::info!("Inserted sighting {}", sighting.predator_id);
    Ok(true)
}

#[derive(Debug, Default)]
struct Collections {
    positions: Vec<Position>,
    sightings: Vec<Sighting>,
    zone: Option<Zone>,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored positions
    pub fn position_count(&self) -> usize {
        self.inner.read().map(|c| c.positions.len()).unwrap_or(0)
    }
}

impl DocumentStore for MemoryStore {
    fn insert_position(&self, position: &Position) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.positions.push(position.clone());
        Ok(())
    }

    fn recent_positions(&self, limit: usize) -> Result<Vec<Position>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(newest_first(inner.positions.clone(), limit))
    }

    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.sightings.push(sighting.clone());
        Ok(())
    }

    fn sightings(&self) -> Result<Vec<Sighting>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.sightings.clone())
    }

    fn zone(&self) -> Result<Option<Zone>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.zone.clone())
    }

    fn set_zone(&self, zone: &Zone) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.zone = Some(zone.clone());
        Ok(())
    }
}

/// JSON-lines store rooted at a directory.
///
/// Append handles are opened once and shared behind locks.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    positions: Mutex<File>,
    sightings: Mutex<File>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let append = |name: &str| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))
        };
        let positions = Mutex::new(append(POSITIONS_FILE)?);
        let sightings = Mutex::new(append(SIGHTINGS_FILE)?);

        log::info!("Opened document store at {}", dir.display());
        Ok(Self {
            dir,
            positions,
            sightings,
        })
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<T: Serialize>(file: &Mutex<File>, doc: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(doc)?;
        line.push('\n');
        let mut file = file.lock().map_err(|_| StoreError::Poisoned)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn read_lines<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        for (n, bytes) in BufReader::new(file).split(b'\n').enumerate() {
            let line = match String::from_utf8(bytes?) {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Skipping non UTF-8 record {}:{}: {}", name, n + 1, e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(doc) => docs.push(doc),
                Err(e) => log::warn!("Skipping malformed record {}:{}: {}", name, n + 1, e),
            }
        }
        Ok(docs)
    }
}

impl DocumentStore for JsonFileStore {
    fn insert_position(&self, position: &Position) -> Result<(), StoreError> {
        Self::append(&self.positions, &PositionDocument::from(position))
    }

    fn recent_positions(&self, limit: usize) -> Result<Vec<Position>, StoreError> {
        let docs: Vec<PositionDocument> = self.read_lines(POSITIONS_FILE)?;
        Ok(newest_first(docs.into_iter().map(Position::from).collect(), limit))
    }

    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError> {
        Self::append(&self.sightings, &SightingDocument::from(sighting))
    }

    fn sightings(&self) -> Result<Vec<Sighting>, StoreError> {
        let docs: Vec<SightingDocument> = self.read_lines(SIGHTINGS_FILE)?;
        Ok(docs.into_iter().map(Sighting::from).collect())
    }

    fn zone(&self) -> Result<Option<Zone>, StoreError> {
        let path = self.dir.join(ZONE_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let parsed = serde_json::from_str::<ZoneDocument>(&text)
            .map_err(StoreError::from)
            .and_then(Zone::try_from);
        match parsed {
            Ok(zone) => Ok(Some(zone)),
            Err(e) => {
                log::warn!("Ignoring malformed zone {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn set_zone(&self, zone: &Zone) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&ZoneDocument::from(zone))?;
        std::fs::write(self.dir.join(ZONE_FILE), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn zone() -> Zone {
        Zone::new(
            "Test Forest",
            vec![c(74.84, 13.63), c(74.85, 13.63), c(74.85, 13.64), c(74.84, 13.64)],
        )
        .unwrap()
    }

    fn exercise(store: &dyn DocumentStore) {
        store.insert_position(&Position::new("COW001", t(0), c(74.846, 13.635))).unwrap();
        store.insert_position(&Position::new("COW002", t(5), c(74.847, 13.636))).unwrap();
        store.insert_position(&Position::new("COW001", t(10), c(74.848, 13.637))).unwrap();

        let recent = store.recent_positions(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, t(10));
        assert_eq!(recent[1].entity_id, "COW002");

        let sighting = Sighting::new("LEO_SYNTH001", t(0), c(74.8465, 13.6355))
            .with_risk_level("HIGH")
            .with_notes("Test leopard inserted");
        assert!(seed_sighting_once(store, &sighting).unwrap());
        assert!(!seed_sighting_once(store, &sighting).unwrap());
        assert_eq!(store.sightings().unwrap(), vec![sighting.clone()]);
        assert_eq!(store.find_sighting("LEO_SYNTH001").unwrap(), Some(sighting));
        assert_eq!(store.find_sighting("LEO_X").unwrap(), None);

        assert_eq!(store.zone().unwrap(), None);
        store.set_zone(&zone()).unwrap();
        assert_eq!(store.zone().unwrap(), Some(zone()));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert_eq!(store.position_count(), 3);
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        exercise(&store);

        // A fresh handle sees the same data
        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.recent_positions(10).unwrap().len(), 3);
        assert_eq!(reopened.zone().unwrap(), Some(zone()));
    }

    #[test]
    fn test_document_shapes() {
        let doc = PositionDocument::from(&Position::new("COW001", t(0), c(74.846, 13.635)));
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["cow_id"], "COW001");
        assert_eq!(json["location"]["type"], "Point");
        assert_eq!(json["location"]["coordinates"][0], 74.846);

        let zone_json = serde_json::to_value(ZoneDocument::from(&zone())).unwrap();
        assert_eq!(zone_json["area"]["type"], "Polygon");
        assert_eq!(zone_json["area"]["coordinates"][0].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.insert_position(&Position::new("COW001", t(0), c(74.846, 13.635))).unwrap();

        let mut raw = OpenOptions::new()
            .append(true)
            .open(dir.path().join(POSITIONS_FILE))
            .unwrap();
        writeln!(raw, "{{not json").unwrap();
        writeln!(
            raw,
            r#"{{"cow_id":"COW9","timestamp":"2025-03-01T06:00:00Z","location":{{"type":"Point","coordinates":[200.0,13.0]}}}}"#
        )
        .unwrap();

        store.insert_position(&Position::new("COW002", t(1), c(74.847, 13.636))).unwrap();
        let recent = store.recent_positions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].entity_id, "COW002");
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.insert_position(&Position::new("COW001", t(0), c(74.846, 13.635))).unwrap();

        let mut raw = OpenOptions::new()
            .append(true)
            .open(dir.path().join(POSITIONS_FILE))
            .unwrap();
        raw.write_all(b"{\"cow_id\":\"\xff\xfe\"}\n").unwrap();

        store.insert_position(&Position::new("COW002", t(1), c(74.847, 13.636))).unwrap();
        let recent = store.recent_positions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].entity_id, "COW001");
    }

    #[test]
    fn test_latest_per_entity() {
        let newest_first = vec![
            Position::new("COW001", t(10), c(74.848, 13.637)),
            Position::new("COW002", t(5), c(74.847, 13.636)),
            Position::new("COW001", t(0), c(74.846, 13.635)),
        ];
        let latest = latest_per_entity(&newest_first);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].timestamp, t(10));
    }
}
