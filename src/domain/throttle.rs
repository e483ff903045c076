//! Reverse-lookup throttle
//!
//! Gates expensive geocoding calls on elapsed time and travelled distance.
//! Both are measured against the last lookup that actually fired, never
//! against the last location update.

use crate::domain::geo::haversine_distance;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MIN_DISTANCE_M: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
struct FiredLookup {
    at: Instant,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone)]
pub struct LookupThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    last_fired: Option<FiredLookup>,
}

impl Default for LookupThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL, DEFAULT_MIN_DISTANCE_M)
    }
}

impl LookupThrottle {
    pub fn new(min_interval: Duration, min_distance_m: f64) -> Self {
        Self {
            min_interval,
            min_distance_m,
            last_fired: None,
        }
    }

    /// Whether a lookup for this position should fire now. The first
    /// position always fires.
    pub fn should_fire(&self, now: Instant, latitude: f64, longitude: f64) -> bool {
        let Some(last) = self.last_fired else {
            return true;
        };

        let elapsed = now.saturating_duration_since(last.at);
        if elapsed > self.min_interval {
            return true;
        }

        haversine_distance(last.latitude, last.longitude, latitude, longitude) > self.min_distance_m
    }

    /// Record a lookup that fired
    pub fn record(&mut self, now: Instant, latitude: f64, longitude: f64) {
        self.last_fired = Some(FiredLookup {
            at: now,
            latitude,
            longitude,
        });
    }

    /// Check and record in one step. Returns true when the lookup fires.
    pub fn check(&mut self, now: Instant, latitude: f64, longitude: f64) -> bool {
        if self.should_fire(now, latitude, longitude) {
            self.record(now, latitude, longitude);
            true
        } else {
            false
        }
    }
}
