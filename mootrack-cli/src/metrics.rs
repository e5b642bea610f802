// MooTrack CLI - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the map server.
//!
//! Gauges mirror the most recent dashboard pass; counters accumulate
//! over the life of the process.

use lazy_static::lazy_static;
use mootrack::{MapView, RiskLabel};
use prometheus::{
    register_counter, register_gauge, register_gauge_vec, Counter, Encoder, Gauge, GaugeVec,
    TextEncoder,
};

lazy_static! {
    /// Animals on the latest map.
    pub static ref TRACKED_ENTITIES: Gauge = register_gauge!(
        "mootrack_tracked_entities",
        "Animals shown on the latest map"
    ).unwrap();

    /// Animals inside the forest zone on the latest map.
    pub static ref ENTITIES_IN_FOREST: Gauge = register_gauge!(
        "mootrack_entities_in_forest",
        "Animals inside the forest zone on the latest map"
    ).unwrap();

    /// Predator sightings on record.
    pub static ref PREDATOR_SIGHTINGS: Gauge = register_gauge!(
        "mootrack_predator_sightings",
        "Predator sightings on record"
    ).unwrap();

    /// Animals per risk outcome (labeled by outcome name).
    pub static ref RISK_ENTITIES: GaugeVec = register_gauge_vec!(
        "mootrack_risk_entities",
        "Animals per risk outcome on the latest map",
        &["risk"]
    ).unwrap();

    /// Whether a forest zone is configured (1 = yes).
    pub static ref ZONE_LOADED: Gauge = register_gauge!(
        "mootrack_zone_loaded",
        "Forest zone present in the store (1=yes, 0=no)"
    ).unwrap();

    /// Successful dashboard passes.
    pub static ref DASHBOARD_PASSES_TOTAL: Counter = register_counter!(
        "mootrack_dashboard_passes_total",
        "Dashboard passes completed"
    ).unwrap();

    /// Dashboard passes that failed to read the store.
    pub static ref DASHBOARD_FAILURES_TOTAL: Counter = register_counter!(
        "mootrack_dashboard_failures_total",
        "Dashboard passes that failed"
    ).unwrap();
}

/// Outcome names that always get a series, even when zero.
fn outcome_names() -> impl Iterator<Item = &'static str> {
    RiskLabel::ALL
        .into_iter()
        .map(|l| l.as_str())
        .chain(["N/A", "Error"])
}

/// Update gauges from a completed pass.
pub fn record_view(view: &MapView) {
    TRACKED_ENTITIES.set(view.markers.len() as f64);
    ENTITIES_IN_FOREST.set(view.markers.iter().filter(|m| m.in_forest).count() as f64);
    PREDATOR_SIGHTINGS.set(view.sightings.len() as f64);
    ZONE_LOADED.set(if view.zone.is_some() { 1.0 } else { 0.0 });

    for name in outcome_names() {
        RISK_ENTITIES.with_label_values(&[name]).set(view.count(name) as f64);
    }
    DASHBOARD_PASSES_TOTAL.inc();
}

/// Count a failed pass.
pub fn record_failure() {
    DASHBOARD_FAILURES_TOTAL.inc();
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mootrack::{Coordinate, EntityMarker, MarkerColor, RiskOutcome, TimeOfDay};

    fn marker(id: &str, risk: RiskOutcome, in_forest: bool) -> EntityMarker {
        EntityMarker {
            entity_id: id.to_string(),
            coordinate: Coordinate::new(74.846, 13.635).unwrap(),
            timestamp: Utc::now(),
            color: MarkerColor::for_outcome(&risk),
            risk,
            in_forest,
            distance_to_forest_m: 120.0,
            distance_to_predator_m: 80.0,
        }
    }

    #[test]
    fn test_outcome_names() {
        let names: Vec<_> = outcome_names().collect();
        assert_eq!(names, vec!["low", "medium", "high", "very high", "N/A", "Error"]);
    }

    #[test]
    fn test_record_view_and_encode() {
        let markers = vec![
            marker("COW001", RiskOutcome::Label(RiskLabel::High), true),
            marker("COW002", RiskOutcome::Label(RiskLabel::Low), false),
        ];
        let mut summary = mootrack::dashboard::RiskSummary::new();
        summary.insert("high".to_string(), 1);
        summary.insert("low".to_string(), 1);

        let view = MapView {
            center: Some(markers[0].coordinate),
            zone: None,
            sightings: Vec::new(),
            markers,
            summary,
            time_of_day: TimeOfDay::Night,
            generated_at: Utc::now(),
        };
        record_view(&view);

        assert_eq!(TRACKED_ENTITIES.get(), 2.0);
        assert_eq!(ENTITIES_IN_FOREST.get(), 1.0);
        assert_eq!(RISK_ENTITIES.with_label_values(&["high"]).get(), 1.0);
        assert_eq!(RISK_ENTITIES.with_label_values(&["very high"]).get(), 0.0);

        let output = encode_metrics();
        assert!(output.contains("mootrack_tracked_entities"));
        assert!(output.contains("mootrack_dashboard_passes_total"));
    }
}
