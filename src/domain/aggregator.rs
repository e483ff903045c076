//! Sensor Aggregator
//!
//! Merges independent heading, attitude and location streams into one
//! [`FusedReading`] and gates reverse-geocoding behind a [`LookupThrottle`].
//!
//! Each field group is replaced atomically through the watch channel, so
//! updates apply in delivery order and untouched groups keep their values.

use crate::domain::models::FusedReading;
use crate::domain::payload::unix_now;
use crate::domain::throttle::LookupThrottle;
use crate::infrastructure::geocoding::Geocoder;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Address text stored when a lookup fails or finds nothing
pub const UNRESOLVED_ADDRESS: &str = "unresolved";

#[derive(Debug, Clone, Default, PartialEq)]
struct AddressState {
    seq: u64,
    text: Option<String>,
}

#[derive(Clone)]
pub struct SensorAggregator {
    reading_tx: Arc<watch::Sender<FusedReading>>,
    address_tx: Arc<watch::Sender<AddressState>>,
    throttle: Arc<Mutex<LookupThrottle>>,
    geocoder: Arc<dyn Geocoder>,
    next_lookup_seq: Arc<AtomicU64>,
}

impl SensorAggregator {
    pub fn new(geocoder: Arc<dyn Geocoder>, throttle: LookupThrottle) -> Self {
        let (reading_tx, _) = watch::channel(FusedReading::default());
        let (address_tx, _) = watch::channel(AddressState::default());

        Self {
            reading_tx: Arc::new(reading_tx),
            address_tx: Arc::new(address_tx),
            throttle: Arc::new(Mutex::new(throttle)),
            geocoder,
            next_lookup_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the heading fields. No validation; normalization happens
    /// when the heading is read for display.
    pub fn ingest_heading(&self, magnetic: f64, true_heading: f64) {
        let timestamp = unix_now();
        self.reading_tx.send_modify(|r| {
            r.magnetic_heading = magnetic;
            r.true_heading = true_heading;
            r.timestamp = timestamp;
        });
    }

    pub fn ingest_attitude(&self, pitch: f64, roll: f64, yaw: f64) {
        let timestamp = unix_now();
        self.reading_tx.send_modify(|r| {
            r.pitch = pitch;
            r.roll = roll;
            r.yaw = yaw;
            r.timestamp = timestamp;
        });
    }

    /// Replace the position fields and fire a reverse lookup if the
    /// throttle allows it.
    ///
    /// Must be called from within a tokio runtime for the lookup to run;
    /// outside one the position is still stored.
    pub fn ingest_location(&self, latitude: f64, longitude: f64, altitude: f64) {
        let timestamp = unix_now();
        self.reading_tx.send_modify(|r| {
            r.latitude = latitude;
            r.longitude = longitude;
            r.altitude = altitude;
            r.timestamp = timestamp;
        });

        let fire = {
            let mut throttle = self.throttle.lock().unwrap_or_else(|e| e.into_inner());
            throttle.check(Instant::now(), latitude, longitude)
        };

        if fire {
            self.spawn_lookup(latitude, longitude);
        }
    }

    /// Latest fused reading. Pure read.
    pub fn current_reading(&self) -> FusedReading {
        *self.reading_tx.borrow()
    }

    /// Observe every published reading
    pub fn subscribe(&self) -> watch::Receiver<FusedReading> {
        self.reading_tx.subscribe()
    }

    /// Last resolved address; `None` until the first lookup completes
    pub fn address(&self) -> Option<String> {
        self.address_tx.borrow().text.clone()
    }

    fn spawn_lookup(&self, latitude: f64, longitude: f64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime; skipping reverse lookup");
                return;
            }
        };

        let seq = self.next_lookup_seq.fetch_add(1, Ordering::Relaxed);
        let geocoder = self.geocoder.clone();
        let address_tx = self.address_tx.clone();

        debug!(seq, latitude, longitude, "Reverse lookup fired");
        handle.spawn(async move {
            let text = match geocoder.reverse_lookup(latitude, longitude).await {
                Ok(Some(placemark)) => placemark
                    .display()
                    .unwrap_or_else(|| UNRESOLVED_ADDRESS.to_string()),
                Ok(None) => {
                    debug!(seq, "Reverse lookup returned nothing");
                    UNRESOLVED_ADDRESS.to_string()
                }
                Err(e) => {
                    warn!(seq, "Reverse lookup failed: {}", e);
                    UNRESOLVED_ADDRESS.to_string()
                }
            };

            // A slow lookup must not overwrite a newer one
            address_tx.send_if_modified(|state| {
                if seq > state.seq {
                    state.seq = seq;
                    state.text = Some(text);
                    true
                } else {
                    false
                }
            });
        });
    }
}
