// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end tests: simulator, file store, geofence, proximity rule,
//! cooldown and notification wired together.

use chrono::{Duration, TimeZone, Utc};
use mootrack::{
    ContainmentMode, Coordinate, CooldownTracker, Dashboard, DashboardConfig, DocumentStore,
    Geofence, JsonFileStore, ManualClock, MarkerColor, NotifyError, Notifier, Position,
    ProximityRule, RiskLabel, RiskOutcome, Sighting, SimulationConfig, Simulator, Zone,
};
use mootrack::notify::{AlertChannel, DeliveryId};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Notifier that records what it was asked to send
#[derive(Clone, Default)]
struct Outbox {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl Outbox {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn last(&self) -> Option<(String, String)> {
        self.messages.lock().unwrap().last().cloned()
    }
}

impl Notifier for Outbox {
    fn send(&self, body: &str, to: &str) -> Result<DeliveryId, NotifyError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push((to.to_string(), body.to_string()));
        Ok(format!("SM{:04}", messages.len()))
    }
}

/// Notifier that always fails
struct Broken;

impl Notifier for Broken {
    fn send(&self, _body: &str, _to: &str) -> Result<DeliveryId, NotifyError> {
        Err(NotifyError::Transport("connection refused".to_string()))
    }
}

fn c(lon: f64, lat: f64) -> Coordinate {
    Coordinate::new(lon, lat).unwrap()
}

fn forest() -> Zone {
    Zone::new(
        "Test Forest",
        vec![
            c(74.84, 13.63),
            c(74.85, 13.63),
            c(74.85, 13.64),
            c(74.84, 13.64),
            c(74.84, 13.63),
        ],
    )
    .unwrap()
}

fn stationary_config() -> SimulationConfig {
    let mut config = SimulationConfig::assessed()
        .with_herd_size(1)
        .with_seed(42)
        .with_tick_interval_ms(0);
    config.walk.max_step_deg = 0.0;
    config
}

#[test]
fn test_alert_once_within_cooldown() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    store.set_zone(&forest()).unwrap();

    let start = Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap();
    let cow = c(74.845, 13.635);
    let leopard = cow.offset(0.0, 0.001_35);
    let distance = cow.distance_to(&leopard);
    assert!(distance > 140.0 && distance < 160.0, "distance {}", distance);

    store
        .insert_sighting(
            &Sighting::new("LEO_SYNTH001", start, leopard)
                .with_risk_level("HIGH")
                .with_notes("Test leopard inserted"),
        )
        .unwrap();

    let clock = ManualClock::new(start);
    let outbox = Outbox::default();
    let mut sim = Simulator::with_cooldown(
        stationary_config(),
        store.clone(),
        CooldownTracker::with_clock(clock.clone()),
    )
    .with_geofence(Geofence::new(ContainmentMode::BoundingBox))
    .with_policy(Box::new(ProximityRule::default()))
    .with_herd(vec![Position::new("COW001", start, cow)])
    .with_alerts(AlertChannel::new(Box::new(outbox.clone()), "+15550100"));

    let first = sim.tick();
    let assessment = &first.assessments[0];
    assert!(assessment.in_forest);
    assert_eq!(assessment.outcome, RiskOutcome::Label(RiskLabel::High));
    assert!(assessment.alerted);
    assert_eq!(outbox.count(), 1);

    let (to, body) = outbox.last().unwrap();
    assert_eq!(to, "+15550100");
    assert!(body.starts_with("ALERT!\nCow: COW001\n"));
    assert!(body.contains("Forest: Yes"));
    assert!(body.contains("Leopard Risk: high"));

    for _ in 0..5 {
        clock.advance(Duration::seconds(100));
        let report = sim.tick();
        assert_eq!(report.alerts_raised, 0);
        assert_eq!(report.alerts_suppressed, 1);
    }
    clock.advance(Duration::seconds(99));
    sim.tick();
    assert_eq!(outbox.count(), 1, "no second alert within 600 s");

    clock.advance(Duration::seconds(1));
    assert_eq!(sim.tick().alerts_delivered, 1);
    assert_eq!(outbox.count(), 2);

    // Every tick was persisted
    assert_eq!(store.recent_positions(100).unwrap().len(), 8);
}

#[test]
fn test_delivery_failure_does_not_stop_tick() {
    let store = Arc::new(mootrack::MemoryStore::new());
    store.set_zone(&forest()).unwrap();

    let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let herd = vec![
        Position::new("COW001", start, c(74.845, 13.635)),
        Position::new("COW002", start, c(74.842, 13.632)),
    ];
    let mut sim = Simulator::with_cooldown(
        stationary_config().with_herd_size(2),
        store.clone(),
        CooldownTracker::with_clock(clock),
    )
    .with_herd(herd)
    .with_alerts(AlertChannel::new(Box::new(Broken), "+15550100"));

    let report = sim.tick();
    assert_eq!(report.persisted, 2);
    assert_eq!(report.alerts_raised, 2);
    assert_eq!(report.delivery_failures, 2);
    assert_eq!(report.assessments.len(), 2);
}

#[test]
fn test_outside_forest_far_from_predators_is_quiet() {
    let store = Arc::new(mootrack::MemoryStore::new());
    store.set_zone(&forest()).unwrap();
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();

    let outbox = Outbox::default();
    let mut sim = Simulator::with_cooldown(
        stationary_config(),
        store,
        CooldownTracker::with_clock(ManualClock::new(start)),
    )
    .with_herd(vec![Position::new("COW001", start, c(74.90, 13.70))])
    .with_alerts(AlertChannel::new(Box::new(outbox.clone()), "+15550100"));

    let report = sim.tick();
    assert!(!report.assessments[0].in_forest);
    assert_eq!(report.assessments[0].outcome, RiskOutcome::Label(RiskLabel::Low));
    assert!(report.assessments[0].distance_to_predator_m.is_infinite());
    assert_eq!(outbox.count(), 0);
}

#[test]
fn test_simulated_positions_feed_dashboard() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    store.set_zone(&forest()).unwrap();

    let config = SimulationConfig::assessed()
        .with_iterations(Some(3))
        .with_tick_interval_ms(0)
        .with_seed(7);
    let summary = Simulator::new(config, store.clone()).run();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.persisted, 30);

    let dashboard = Dashboard::new(
        store,
        Box::new(ProximityRule::default()),
        DashboardConfig::new().with_position_limit(50),
    );
    let view = dashboard.render().unwrap();
    assert_eq!(view.markers.len(), 10);
    assert!(view.zone.is_some());
    assert_eq!(view.count("low"), 10);
    assert!(view.markers.iter().all(|m| m.color == MarkerColor::Green));
}
