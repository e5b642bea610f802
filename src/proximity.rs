// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Predator proximity scanning.

use crate::geo::{geodesic_distance, Coordinate};
use crate::record::Sighting;

/// Distance reported when there are no sightings at all.
///
/// Every classifier treats it as "no predator risk".
pub const NO_SIGHTING_DISTANCE_M: f64 = f64::INFINITY;

/// Radius (meters) under which a sighting marks an animal as high risk
pub const HIGH_RISK_RADIUS_M: f64 = 300.0;

/// Closest sighting to `point` and its geodesic distance in meters.
pub fn nearest<'a>(point: &Coordinate, sightings: &'a [Sighting]) -> Option<(&'a Sighting, f64)> {
    sightings
        .iter()
        .map(|s| (s, geodesic_distance(point, &s.coordinate)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Minimum geodesic distance (meters) from `point` to any sighting.
///
/// Returns [`NO_SIGHTING_DISTANCE_M`] for an empty slice.
pub fn nearest_distance(point: &Coordinate, sightings: &[Sighting]) -> f64 {
    nearest(point, sightings)
        .map(|(_, d)| d)
        .unwrap_or(NO_SIGHTING_DISTANCE_M)
}

/// Is any sighting within [`HIGH_RISK_RADIUS_M`]?
pub fn within_high_risk_radius(point: &Coordinate, sightings: &[Sighting]) -> bool {
    nearest_distance(point, sightings) < HIGH_RISK_RADIUS_M
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    fn sighting(id: &str, lon: f64, lat: f64) -> Sighting {
        Sighting::new(id, Utc::now(), c(lon, lat))
    }

    #[test]
    fn test_empty_is_sentinel() {
        let d = nearest_distance(&c(74.846, 13.635), &[]);
        assert_eq!(d, NO_SIGHTING_DISTANCE_M);
        assert!(nearest(&c(74.846, 13.635), &[]).is_none());
        assert!(!within_high_risk_radius(&c(74.846, 13.635), &[]));
    }

    #[test]
    fn test_minimum_over_all_sightings() {
        let point = c(74.846, 13.635);
        let sightings = vec![
            sighting("LEO_FAR", 74.90, 13.70),
            sighting("LEO_NEAR", 74.8465, 13.6355),
            sighting("LEO_MID", 74.85, 13.64),
        ];

        let expected = sightings
            .iter()
            .map(|s| geodesic_distance(&point, &s.coordinate))
            .fold(f64::INFINITY, f64::min);

        assert_eq!(nearest_distance(&point, &sightings), expected);
        let (closest, d) = nearest(&point, &sightings).unwrap();
        assert_eq!(closest.predator_id, "LEO_NEAR");
        assert_eq!(d, expected);
    }

    #[test]
    fn test_high_risk_radius() {
        let point = c(74.846, 13.635);
        // ~75 m away
        assert!(within_high_risk_radius(&point, &[sighting("L", 74.8465, 13.6355)]));
        // ~1.1 km away
        assert!(!within_high_risk_radius(&point, &[sighting("L", 74.846, 13.645)]));
    }
}
