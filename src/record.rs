// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Position and sighting records.

use crate::geo::Coordinate;
use chrono::{DateTime, Utc};

/// Identifier of a tracked animal (e.g. `COW001`)
pub type EntityId = String;

/// A timestamped animal position
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
}

impl Position {
    /// Create a new position record
    pub fn new(entity_id: impl Into<EntityId>, timestamp: DateTime<Utc>, coordinate: Coordinate) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            coordinate,
        }
    }
}

/// A recorded predator observation
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub predator_id: String,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
    /// Free-form risk annotation set by whoever logged the sighting
    pub risk_level: String,
    pub notes: String,
}

impl Sighting {
    /// Create a sighting with empty annotation and notes
    pub fn new(predator_id: impl Into<String>, timestamp: DateTime<Utc>, coordinate: Coordinate) -> Self {
        Self {
            predator_id: predator_id.into(),
            timestamp,
            coordinate,
            risk_level: String::new(),
            notes: String::new(),
        }
    }

    /// Set the risk annotation
    pub fn with_risk_level(mut self, risk_level: impl Into<String>) -> Self {
        self.risk_level = risk_level.into();
        self
    }

    /// Set the free-text note
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
