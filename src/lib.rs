//! # MooTrack - Livestock risk tracking
//!
//! Tracks cattle GPS positions, flags forest-zone entry and predator
//! proximity, classifies risk and raises rate-limited SMS alerts.
//!
//! ## Key Features
//!
//! - **Geofencing**: polygon (ray casting) or bounding-box containment
//! - **Predator Proximity**: geodesic distance to the nearest sighting
//! - **Risk Classification**: proximity rule or a trained random forest
//! - **Alert Cooldown**: at most one alert per animal every 10 minutes
//!
//! ## Quick Start
//!
//! ```rust
//! use mootrack::{Coordinate, ProximityRule, RiskFeatures, RiskLabel, RiskOutcome, RiskPolicy, TimeOfDay};
//! use mootrack::proximity::nearest_distance;
//! use mootrack::Sighting;
//! use chrono::Utc;
//!
//! let cow = Coordinate::new(74.846, 13.635).unwrap();
//! let leopard = Sighting::new("LEO1", Utc::now(), Coordinate::new(74.8465, 13.6355).unwrap());
//!
//! let distance = nearest_distance(&cow, &[leopard]);
//! let features = RiskFeatures::new(1_000.0, distance, TimeOfDay::from_hour(21));
//! let outcome = ProximityRule::default().assess(&features);
//!
//! assert_eq!(outcome, RiskOutcome::Label(RiskLabel::High));
//! ```
//!
//! ## Modules
//!
//! - [`geo`]: Coordinates and geodesic distance
//! - [`geofence`]: Forest zones and containment
//! - [`proximity`]: Nearest-sighting scan
//! - [`risk`]: Risk labels and classification policies
//! - [`model`]: Random forest, encoder, training and artifacts
//! - [`cooldown`]: Per-animal alert rate limiting
//! - [`store`]: Document persistence
//! - [`notify`]: SMS notification
//! - [`simulator`]: Herd movement simulation
//! - [`dashboard`]: Map view and GeoJSON export

// Modules
pub mod config;
pub mod cooldown;
pub mod dashboard;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod model;
pub mod notify;
pub mod proximity;
pub mod record;
pub mod risk;
pub mod simulator;
pub mod store;

// Re-exports for convenient access
pub use config::MooTrackConfig;
pub use cooldown::{Clock, CooldownTracker, ManualClock, SystemClock, DEFAULT_COOLDOWN_SECS};
pub use dashboard::{Dashboard, DashboardConfig, EntityMarker, MapView, MarkerColor};
pub use error::{ConfigError, GeoError, ModelError, MooError, NotifyError, Result, StoreError};
pub use geo::{geodesic_distance, Coordinate};
pub use geofence::{BoundingBox, ContainmentMode, Geofence, Zone, NO_ZONE_DISTANCE_M};
pub use model::{RiskModel, TrainingConfig};
pub use notify::{AlertChannel, LogNotifier, Notifier};
#[cfg(feature = "sms")]
pub use notify::TwilioNotifier;
pub use proximity::{nearest_distance, HIGH_RISK_RADIUS_M, NO_SIGHTING_DISTANCE_M};
pub use record::{EntityId, Position, Sighting};
pub use risk::{
    LearnedPolicy, ProximityRule, RiskFeatures, RiskLabel, RiskOutcome, RiskPolicy, TimeOfDay,
};
pub use simulator::{
    BoundaryMode, DriftBounds, RandomWalk, SimulationConfig, Simulator, TickReport,
};
pub use store::{DocumentStore, JsonFileStore, MemoryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_basic_assessment() {
        let cow = Coordinate::new(74.846, 13.635).unwrap();
        let sighting = Sighting::new("LEO1", chrono::Utc::now(), Coordinate::new(74.8465, 13.6355).unwrap());

        let distance = nearest_distance(&cow, std::slice::from_ref(&sighting));
        assert!(distance < HIGH_RISK_RADIUS_M);

        let outcome = ProximityRule::default().assess(&RiskFeatures::new(
            NO_ZONE_DISTANCE_M,
            distance,
            TimeOfDay::Morning,
        ));
        assert!(outcome.is_alerting());
    }
}
