// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Coordinates and geodesic distance on the WGS-84 ellipsoid.
//!
//! Coordinates are stored in GeoJSON order, `(longitude, latitude)`, and
//! serialize as a two-element array so they drop straight into
//! `{"type": "Point", "coordinates": [lon, lat]}` documents.
//!
//! Distances use Vincenty's inverse formula. Near-antipodal pairs where the
//! iteration does not converge fall back to a great-circle distance on the
//! mean Earth radius.

use crate::error::GeoError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS-84 semi-major axis (meters)
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 semi-minor axis (meters)
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// Mean Earth radius (meters), used by the spherical fallback
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// A validated `(longitude, latitude)` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    lon: f64,
    lat: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the WGS-84 ranges.
    pub fn new(lon: f64, lat: f64) -> Result<Self, GeoError> {
        if lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat)
        {
            Ok(Self { lon, lat })
        } else {
            Err(GeoError::InvalidCoordinate { lon, lat })
        }
    }

    /// Create a coordinate, clamping out-of-range values into range.
    ///
    /// Non-finite inputs are replaced by 0.
    pub fn clamped(lon: f64, lat: f64) -> Self {
        let lon = if lon.is_finite() { lon.clamp(-180.0, 180.0) } else { 0.0 };
        let lat = if lat.is_finite() { lat.clamp(-90.0, 90.0) } else { 0.0 };
        Self { lon, lat }
    }

    /// Longitude in degrees
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Latitude in degrees
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Offset by the given deltas (degrees), clamped to valid ranges.
    pub fn offset(&self, d_lon: f64, d_lat: f64) -> Self {
        Self::clamped(self.lon + d_lon, self.lat + d_lat)
    }

    /// Geodesic distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        geodesic_distance(self, other)
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = GeoError;

    fn try_from(pair: [f64; 2]) -> Result<Self, Self::Error> {
        Coordinate::new(pair[0], pair[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lon, c.lat]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lon, self.lat)
    }
}

/// Geodesic distance between two coordinates on the WGS-84 ellipsoid (meters).
pub fn geodesic_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    vincenty_inverse(p1, p2).unwrap_or_else(|| great_circle_distance(p1, p2))
}

/// Vincenty inverse solution. `None` when the iteration fails to converge.
fn vincenty_inverse(p1: &Coordinate, p2: &Coordinate) -> Option<f64> {
    let f = WGS84_F;
    let l = (p2.lon - p1.lon).to_radians();
    let u1 = ((1.0 - f) * p1.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - f) * p2.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0); // coincident points
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial line: cos_sq_alpha = 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - lambda_prev).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let a = 1.0
                + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(WGS84_B * a * (sigma - delta_sigma));
        }
    }

    None
}

/// Haversine distance on a sphere of mean Earth radius (meters).
pub fn great_circle_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = (p2.lat - p1.lat).to_radians();
    let dlon = (p2.lon - p1.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    MEAN_EARTH_RADIUS_M * c
}
