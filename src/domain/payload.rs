//! Wire payload
//!
//! The outbound frame is a flat JSON object. Field names are camelCase to
//! match what the receiving peripheral parses.
//!
//! ```text
//! {
//!   "magneticHeading": 12.5,   "trueHeading": 14.1,
//!   "headingDirection": "N",   "headingDegrees": "14°",
//!   "pitch": 1.2, "roll": -0.4, "yaw": 14.1,
//!   "latitude": 37.33, "longitude": -122.00, "altitude": 12.0,
//!   "timestamp": 1760000000.25
//! }
//! ```

use crate::domain::error::LinkError;
use crate::domain::models::FusedReading;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
    pub magnetic_heading: f64,
    pub true_heading: f64,
    pub heading_direction: String,
    pub heading_degrees: String,
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Wall-clock time the payload was built (Unix seconds, fractional)
    pub timestamp: f64,
}

impl WirePayload {
    pub fn from_reading(reading: &FusedReading, sent_at: f64) -> Self {
        Self {
            magnetic_heading: reading.magnetic_heading,
            true_heading: reading.true_heading,
            heading_direction: reading.octant().label().to_string(),
            heading_degrees: reading.heading_degrees(),
            pitch: reading.pitch,
            roll: reading.roll,
            yaw: reading.yaw,
            latitude: reading.latitude,
            longitude: reading.longitude,
            altitude: reading.altitude,
            timestamp: sent_at,
        }
    }

    /// Rebuild the reading carried by this payload
    pub fn to_reading(&self) -> FusedReading {
        FusedReading {
            magnetic_heading: self.magnetic_heading,
            true_heading: self.true_heading,
            pitch: self.pitch,
            roll: self.roll,
            yaw: self.yaw,
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            timestamp: self.timestamp,
        }
    }

    /// Encode as JSON. Every numeric field must be finite: JSON has no NaN
    /// or infinity and serde_json would write them as `null`.
    pub fn encode(&self) -> Result<Vec<u8>, LinkError> {
        if let Some((field, value)) = self.numbers().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(LinkError::Serialization(serde::ser::Error::custom(format!(
                "{} is not a finite number ({})",
                field, value
            ))));
        }
        Ok(serde_json::to_vec(self)?)
    }

    fn numbers(&self) -> [(&'static str, f64); 9] {
        [
            ("magneticHeading", self.magnetic_heading),
            ("trueHeading", self.true_heading),
            ("pitch", self.pitch),
            ("roll", self.roll),
            ("yaw", self.yaw),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("altitude", self.altitude),
            ("timestamp", self.timestamp),
        ]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Current wall-clock time as fractional Unix seconds
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Split an encoded payload into frames no larger than `max_frame_len`.
/// `None` (or zero) means the transport takes the payload in one write.
pub fn split_frames(payload: &[u8], max_frame_len: Option<usize>) -> Vec<&[u8]> {
    match max_frame_len {
        Some(limit) if limit > 0 && payload.len() > limit => payload.chunks(limit).collect(),
        _ => vec![payload],
    }
}
