// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Movement simulator
//!
//! Animals follow an independent uniform random walk. Each tick every animal
//! is moved, persisted and, when assessment is enabled, checked against the
//! forest zone and predator sightings:
//!
//! ```text
//! move -> persist -> containment + proximity -> policy -> cooldown -> alert
//! ```
//!
//! Persistence and delivery failures are logged and the tick carries on.

use crate::cooldown::{Clock, CooldownTracker, SystemClock};
use crate::geo::Coordinate;
use crate::geofence::{self, Geofence, Zone};
use crate::notify::{alert_message, AlertChannel};
use crate::proximity;
use crate::record::{Position, Sighting};
use crate::risk::{ProximityRule, RiskFeatures, RiskOutcome, RiskPolicy, TimeOfDay};
use crate::store::DocumentStore;
use chrono::{DateTime, Local, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// What happens when a walk leaves its [`DriftBounds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Stop at the edge
    #[default]
    Clamp,
    /// Bounce back by the overshoot
    Reflect,
}

/// Optional box confining the random walk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
    #[serde(default)]
    pub mode: BoundaryMode,
}

impl DriftBounds {
    /// Box of half-width `radius_deg` around a center
    pub fn around(center_lon: f64, center_lat: f64, radius_deg: f64, mode: BoundaryMode) -> Self {
        let radius_deg = radius_deg.abs();
        Self {
            min_lon: center_lon - radius_deg,
            max_lon: center_lon + radius_deg,
            min_lat: center_lat - radius_deg,
            max_lat: center_lat + radius_deg,
            mode,
        }
    }

    fn confine(value: f64, min: f64, max: f64, mode: BoundaryMode) -> f64 {
        if min.is_nan() || max.is_nan() {
            return value;
        }
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let reflected = match mode {
            BoundaryMode::Clamp => value,
            BoundaryMode::Reflect if value < min => min + (min - value),
            BoundaryMode::Reflect if value > max => max - (value - max),
            BoundaryMode::Reflect => value,
        };
        reflected.clamp(min, max)
    }

    /// Bring a coordinate back inside the box
    pub fn apply(&self, coordinate: Coordinate) -> Coordinate {
        Coordinate::clamped(
            Self::confine(coordinate.lon(), self.min_lon, self.max_lon, self.mode),
            Self::confine(coordinate.lat(), self.min_lat, self.max_lat, self.mode),
        )
    }
}

/// Random walk parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalk {
    /// Maximum per-axis step (degrees)
    pub max_step_deg: f64,
    /// Optional confinement
    pub bounds: Option<DriftBounds>,
}

impl RandomWalk {
    /// Move every animal once.
    ///
    /// Each coordinate is shifted by independent uniform offsets in
    /// `[-max_step_deg, max_step_deg]` and stamped with `timestamp`.
    /// Results are always valid coordinates.
    pub fn step<R: Rng + ?Sized>(
        &self,
        herd: &[Position],
        timestamp: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<Position> {
        let step = self.max_step_deg.abs();
        herd.iter()
            .map(|p| {
                let (d_lon, d_lat) = if step > 0.0 {
                    (rng.gen_range(-step..=step), rng.gen_range(-step..=step))
                } else {
                    (0.0, 0.0)
                };
                let mut coordinate = p.coordinate.offset(d_lon, d_lat);
                if let Some(bounds) = &self.bounds {
                    coordinate = bounds.apply(coordinate);
                }
                Position::new(p.entity_id.clone(), timestamp, coordinate)
            })
            .collect()
    }
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of animals
    pub herd_size: usize,
    /// Identifier prefix (`COW`)
    pub id_prefix: String,
    /// Zero-padding width of the identifier number (0 for none)
    pub id_width: usize,
    /// Herd center longitude
    pub base_lon: f64,
    /// Herd center latitude
    pub base_lat: f64,
    /// Initial uniform spread around the center (degrees)
    pub initial_spread_deg: f64,
    /// Random walk
    pub walk: RandomWalk,
    /// Number of ticks, `None` for unbounded
    pub iterations: Option<usize>,
    /// Sleep between ticks (milliseconds)
    pub tick_interval_ms: u64,
    /// Run risk checks and alerts (otherwise persist only)
    pub assess: bool,
    /// RNG seed, entropy when unset
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::assessed()
    }
}

impl SimulationConfig {
    /// Ten animals `COW001..COW010` near the forest, 20 ticks with risk
    /// checks and alerts.
    pub fn assessed() -> Self {
        Self {
            herd_size: 10,
            id_prefix: "COW".to_string(),
            id_width: 3,
            base_lon: 74.846,
            base_lat: 13.635,
            initial_spread_deg: 0.002,
            walk: RandomWalk {
                max_step_deg: 0.0003,
                bounds: None,
            },
            iterations: Some(20),
            tick_interval_ms: 5_000,
            assess: true,
            seed: None,
        }
    }

    /// Five animals `COW1..COW5`, unbounded run, persistence only.
    pub fn continuous() -> Self {
        Self {
            herd_size: 5,
            id_prefix: "COW".to_string(),
            id_width: 0,
            base_lon: 74.8,
            base_lat: 13.0,
            initial_spread_deg: 0.005,
            walk: RandomWalk {
                max_step_deg: 0.0001,
                bounds: None,
            },
            iterations: None,
            tick_interval_ms: 5_000,
            assess: false,
            seed: None,
        }
    }

    /// Set the herd size
    pub fn with_herd_size(mut self, n: usize) -> Self {
        self.herd_size = n;
        self
    }

    /// Set the number of ticks
    pub fn with_iterations(mut self, iterations: Option<usize>) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Confine the walk
    pub fn with_bounds(mut self, bounds: DriftBounds) -> Self {
        self.walk.bounds = Some(bounds);
        self
    }

    /// Fix the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable risk checks
    pub fn with_assess(mut self, assess: bool) -> Self {
        self.assess = assess;
        self
    }

    /// Identifier for the `index`-th animal (0-based)
    pub fn entity_id(&self, index: usize) -> String {
        format!("{}{:0width$}", self.id_prefix, index + 1, width = self.id_width)
    }

    /// Sleep between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Herd scattered uniformly around the base point
    pub fn initial_herd<R: Rng + ?Sized>(&self, timestamp: DateTime<Utc>, rng: &mut R) -> Vec<Position> {
        let spread = self.initial_spread_deg.abs();
        let base = Coordinate::clamped(self.base_lon, self.base_lat);
        (0..self.herd_size)
            .map(|i| {
                let (d_lon, d_lat) = if spread > 0.0 {
                    (rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
                } else {
                    (0.0, 0.0)
                };
                Position::new(self.entity_id(i), timestamp, base.offset(d_lon, d_lat))
            })
            .collect()
    }
}

/// Risk evaluation of one animal during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub entity_id: String,
    pub coordinate: Coordinate,
    pub in_forest: bool,
    pub distance_to_forest_m: f64,
    pub distance_to_predator_m: f64,
    pub outcome: RiskOutcome,
    /// An alert was raised (cooldown permitted it)
    pub alerted: bool,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub persisted: usize,
    pub persist_failures: usize,
    pub assessments: Vec<Assessment>,
    /// Alerts permitted by the cooldown
    pub alerts_raised: usize,
    /// Alerts blocked by the cooldown
    pub alerts_suppressed: usize,
    /// Alerts handed to the notifier successfully
    pub alerts_delivered: usize,
    pub delivery_failures: usize,
}

/// Totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
    pub persisted: usize,
    pub persist_failures: usize,
    pub alerts_raised: usize,
    pub alerts_delivered: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.persisted += report.persisted;
        self.persist_failures += report.persist_failures;
        self.alerts_raised += report.alerts_raised;
        self.alerts_delivered += report.alerts_delivered;
    }
}

/// Simulation context owning the herd and its collaborators
pub struct Simulator<C: Clock = SystemClock> {
    config: SimulationConfig,
    herd: Vec<Position>,
    rng: StdRng,
    store: Arc<dyn DocumentStore>,
    policy: Box<dyn RiskPolicy + Send>,
    geofence: Geofence,
    zone: Option<Zone>,
    sightings: Vec<Sighting>,
    cooldown: CooldownTracker<C>,
    alerts: Option<AlertChannel>,
    ticks: usize,
}

impl Simulator<SystemClock> {
    /// Simulator on the wall clock with the proximity rule and no alerts
    pub fn new(config: SimulationConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self::with_cooldown(config, store, CooldownTracker::new())
    }
}

impl<C: Clock> Simulator<C> {
    /// Simulator using the given cooldown tracker (and its clock)
    pub fn with_cooldown(
        config: SimulationConfig,
        store: Arc<dyn DocumentStore>,
        cooldown: CooldownTracker<C>,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let herd = config.initial_herd(cooldown.clock().now(), &mut rng);

        Self {
            config,
            herd,
            rng,
            store,
            policy: Box::new(ProximityRule::default()),
            geofence: Geofence::default(),
            zone: None,
            sightings: Vec::new(),
            cooldown,
            alerts: None,
            ticks: 0,
        }
    }

    /// Replace the risk policy
    pub fn with_policy(mut self, policy: Box<dyn RiskPolicy + Send>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the containment checker
    pub fn with_geofence(mut self, geofence: Geofence) -> Self {
        self.geofence = geofence;
        self
    }

    /// Enable alert delivery
    pub fn with_alerts(mut self, alerts: AlertChannel) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Replace the herd (e.g. to place animals at known spots)
    pub fn with_herd(mut self, herd: Vec<Position>) -> Self {
        self.herd = herd;
        self
    }

    /// Current herd
    pub fn herd(&self) -> &[Position] {
        &self.herd
    }

    /// Configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Zone in the current snapshot
    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    /// Sightings in the current snapshot
    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    /// Reload the zone and sightings from the store. On failure the previous
    /// snapshot is kept.
    pub fn refresh_context(&mut self) {
        match self.store.zone() {
            Ok(zone) => self.zone = zone,
            Err(e) => log::warn!("Could not load forest zone: {}", e),
        }
        match self.store.sightings() {
            Ok(sightings) => self.sightings = sightings,
            Err(e) => log::warn!("Could not load sightings: {}", e),
        }
    }

    /// Advance one tick
    pub fn tick(&mut self) -> TickReport {
        let now = self.cooldown.clock().now();
        self.ticks += 1;
        self.herd = self.config.walk.step(&self.herd, now, &mut self.rng);

        let mut report = TickReport {
            tick: self.ticks,
            timestamp: Some(now),
            ..TickReport::default()
        };

        if self.config.assess {
            self.refresh_context();
        }
        let time_of_day = TimeOfDay::from_hour(now.with_timezone(&Local).hour());

        let herd = self.herd.clone();
        for position in &herd {
            match self.store.insert_position(position) {
                Ok(()) => {
                    report.persisted += 1;
                    log::debug!("{} at {}", position.entity_id, position.coordinate);
                }
                Err(e) => {
                    report.persist_failures += 1;
                    log::warn!("Failed to persist {}: {}", position.entity_id, e);
                }
            }

            if self.config.assess {
                let assessment = self.assess(position, time_of_day, now, &mut report);
                report.assessments.push(assessment);
            }
        }

        log::info!(
            "Tick {}: {} positions stored, {} alerts",
            report.tick,
            report.persisted,
            report.alerts_raised
        );
        report
    }

    fn assess(
        &mut self,
        position: &Position,
        time_of_day: TimeOfDay,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Assessment {
        let coordinate = position.coordinate;
        let in_forest = self.geofence.contains(&coordinate, self.zone.as_ref());
        let distance_to_predator_m = proximity::nearest_distance(&coordinate, &self.sightings);
        let distance_to_forest_m = geofence::distance_to_forest(&coordinate, self.zone.as_ref());

        let features = RiskFeatures::new(distance_to_forest_m, distance_to_predator_m, time_of_day);
        let outcome = self.policy.assess(&features);

        let mut alerted = false;
        if in_forest || outcome.is_alerting() {
            if self.cooldown.should_alert_at(&position.entity_id, now) {
                alerted = true;
                report.alerts_raised += 1;
                let body = alert_message(&position.entity_id, &coordinate, in_forest, &outcome);
                match &self.alerts {
                    Some(channel) => match channel.deliver(&body) {
                        Ok(id) => {
                            report.alerts_delivered += 1;
                            log::info!("Alert for {} sent ({})", position.entity_id, id);
                        }
                        Err(e) => {
                            report.delivery_failures += 1;
                            log::error!("Alert for {} failed: {}", position.entity_id, e);
                        }
                    },
                    None => log::warn!("Alert for {} not delivered (alerts disabled)", position.entity_id),
                }
            } else {
                report.alerts_suppressed += 1;
            }
        }

        Assessment {
            entity_id: position.entity_id.clone(),
            coordinate,
            in_forest,
            distance_to_forest_m,
            distance_to_predator_m,
            outcome,
            alerted,
        }
    }

    /// Run the configured number of ticks (forever when unbounded),
    /// sleeping between them.
    pub fn run(&mut self) -> RunSummary {
        log::info!(
            "Starting simulation: {} animals, {} policy, {}",
            self.herd.len(),
            self.policy.name(),
            match self.config.iterations {
                Some(n) => format!("{} ticks", n),
                None => "unbounded".to_string(),
            }
        );

        let mut summary = RunSummary::default();
        let interval = self.config.tick_interval();
        let mut remaining = self.config.iterations;
        loop {
            if remaining == Some(0) {
                break;
            }
            let report = self.tick();
            summary.absorb(&report);
            remaining = remaining.map(|n| n - 1);

            if remaining != Some(0) && !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        log::info!(
            "Simulation finished: {} ticks, {} positions, {} alerts",
            summary.ticks,
            summary.persisted,
            summary.alerts_raised
        );
        summary
    }
}
