//! Timers owned by the session actor.
//!
//! Both kinds pend forever while disarmed so they can sit in a `select!`
//! unconditionally. Disarming takes effect immediately: the actor never
//! observes a tick from a timer it has stopped.

use std::future::pending;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, Interval, MissedTickBehavior};

/// Repeating timer. The first tick completes immediately after `start`.
#[derive(Debug, Default)]
pub(crate) struct Periodic {
    interval: Option<Interval>,
}

impl Periodic {
    pub fn start(&mut self, period: Duration) {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(timer);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => pending::<()>().await,
        }
    }
}

/// One-shot timer
#[derive(Debug, Default)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, after: Duration) {
        self.at = Some(Instant::now() + after);
    }

    pub fn disarm(&mut self) {
        self.at = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    pub async fn elapsed(&mut self) {
        match self.at {
            Some(at) => {
                sleep_until(at).await;
                self.at = None;
            }
            None => pending::<()>().await,
        }
    }
}
