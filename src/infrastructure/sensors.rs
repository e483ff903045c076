//! Simulated sensor feed
//!
//! Stands in for the platform heading, attitude and location callbacks.
//! Each stream runs on its own task at its own rate and pushes straight into
//! the [`SensorAggregator`], just as independent platform callbacks would.

use crate::domain::aggregator::SensorAggregator;
use crate::domain::geo::{normalize_degrees, offset_north};
use crate::domain::settings::SensorSettings;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Local magnetic declination applied to the simulated true heading
const DECLINATION_DEG: f64 = 13.2;
/// Heading sweep speed
const TURN_RATE_DEG_PER_S: f64 = 12.0;
/// Walking pace for the location stream
const WALK_SPEED_M_PER_S: f64 = 1.4;

pub struct SimulatedSensorFeed {
    tasks: Vec<JoinHandle<()>>,
}

impl SimulatedSensorFeed {
    pub fn start(aggregator: SensorAggregator, settings: &SensorSettings) -> Self {
        info!(
            "Starting simulated sensors (heading {} Hz, attitude {} Hz, location {} Hz)",
            settings.heading_rate_hz, settings.attitude_rate_hz, settings.location_rate_hz
        );

        let heading = {
            let aggregator = aggregator.clone();
            let period = period_for(settings.heading_rate_hz);
            tokio::spawn(async move {
                let mut timer = interval(period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut magnetic = 0.0_f64;
                loop {
                    timer.tick().await;
                    magnetic =
                        normalize_degrees(magnetic + TURN_RATE_DEG_PER_S * period.as_secs_f64());
                    aggregator.ingest_heading(magnetic, magnetic + DECLINATION_DEG);
                }
            })
        };

        let attitude = {
            let aggregator = aggregator.clone();
            let period = period_for(settings.attitude_rate_hz);
            tokio::spawn(async move {
                let mut timer = interval(period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut t = 0.0_f64;
                loop {
                    timer.tick().await;
                    t += period.as_secs_f64();
                    // Hand-held wobble that occasionally tips past the flat threshold
                    let pitch = 8.0 * (t * 0.7).sin() + 4.0 * (t * 0.13).sin();
                    let roll = 6.0 * (t * 0.9).cos();
                    let yaw = normalize_degrees(t * TURN_RATE_DEG_PER_S);
                    aggregator.ingest_attitude(pitch, roll, yaw);
                }
            })
        };

        let location = {
            let period = period_for(settings.location_rate_hz);
            let start_lat = settings.start_latitude;
            let longitude = settings.start_longitude;
            tokio::spawn(async move {
                let mut timer = interval(period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut walked = 0.0_f64;
                loop {
                    timer.tick().await;
                    let latitude = offset_north(start_lat, walked);
                    aggregator.ingest_location(latitude, longitude, 12.0);
                    walked += WALK_SPEED_M_PER_S * period.as_secs_f64();
                }
            })
        };

        Self {
            tasks: vec![heading, attitude, location],
        }
    }

    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SimulatedSensorFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn period_for(rate_hz: f64) -> Duration {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Duration::from_secs_f64(1.0 / rate_hz)
    } else {
        Duration::from_secs(1)
    }
}
