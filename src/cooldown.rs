// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-entity alert cooldown
//!
//! The first alert for an entity is always permitted. Later alerts are
//! suppressed until [`DEFAULT_COOLDOWN_SECS`] (600 s) have elapsed since the last
//! *permitted* alert; suppressed attempts do not restart the timer.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Minimum interval (seconds) between two alerts for the same entity
pub const DEFAULT_COOLDOWN_SECS: i64 = 600;

/// Time source
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for simulated time. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump to an instant
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Tracks the last permitted alert per entity
#[derive(Debug)]
pub struct CooldownTracker<C: Clock = SystemClock> {
    clock: C,
    cooldown: Duration,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl CooldownTracker<SystemClock> {
    /// Wall-clock tracker with the default cooldown
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for CooldownTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> CooldownTracker<C> {
    /// Tracker reading time from `clock`
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            last_alert: HashMap::new(),
        }
    }

    /// Override the cooldown interval
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Time source
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Configured interval
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// May `entity_id` alert now? Stamps the clock's current time when it may.
    pub fn should_alert(&mut self, entity_id: &str) -> bool {
        let now = self.clock.now();
        self.should_alert_at(entity_id, now)
    }

    /// [`CooldownTracker::should_alert`] at an explicit instant.
    pub fn should_alert_at(&mut self, entity_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(entity_id) {
            Some(last) if now.signed_duration_since(*last) < self.cooldown => {
                log::debug!("Alert for {} suppressed by cooldown", entity_id);
                false
            }
            _ => {
                self.last_alert.insert(entity_id.to_string(), now);
                true
            }
        }
    }

    /// Last permitted alert for an entity
    pub fn last_alert(&self, entity_id: &str) -> Option<DateTime<Utc>> {
        self.last_alert.get(entity_id).copied()
    }

    /// Forget all state
    pub fn reset(&mut self) {
        self.last_alert.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_first_then_suppressed_then_permitted() {
        let mut tracker = CooldownTracker::new();
        assert!(tracker.should_alert_at("COW001", t0()));
        assert!(!tracker.should_alert_at("COW001", t0()));
        assert!(!tracker.should_alert_at("COW001", t0() + Duration::seconds(599)));
        assert!(tracker.should_alert_at("COW001", t0() + Duration::seconds(600)));
    }

    #[test]
    fn test_suppressed_attempt_does_not_restamp() {
        let mut tracker = CooldownTracker::new();
        assert!(tracker.should_alert_at("COW001", t0()));
        assert!(!tracker.should_alert_at("COW001", t0() + Duration::seconds(500)));
        assert_eq!(tracker.last_alert("COW001"), Some(t0()));
        assert!(tracker.should_alert_at("COW001", t0() + Duration::seconds(601)));
    }

    #[test]
    fn test_entities_are_independent() {
        let mut tracker = CooldownTracker::new();
        assert!(tracker.should_alert_at("COW001", t0()));
        assert!(tracker.should_alert_at("COW002", t0()));
        assert!(!tracker.should_alert_at("COW001", t0()));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(t0());
        let mut tracker = CooldownTracker::with_clock(clock.clone());

        assert!(tracker.should_alert("COW007"));
        clock.advance(Duration::seconds(300));
        assert!(!tracker.should_alert("COW007"));
        clock.advance(Duration::seconds(300));
        assert!(tracker.should_alert("COW007"));
    }

    #[test]
    fn test_custom_cooldown_and_reset() {
        let mut tracker = CooldownTracker::new().with_cooldown(Duration::seconds(10));
        assert!(tracker.should_alert_at("A", t0()));
        assert!(tracker.should_alert_at("A", t0() + Duration::seconds(10)));
        tracker.reset();
        assert_eq!(tracker.last_alert("A"), None);
    }
}
