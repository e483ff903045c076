//! Compass Relay
//!
//! Fuses heading, attitude and location streams into a single reading and
//! relays it to a peripheral over a short-range wireless link.
//!
//! - [`domain`] - Readings, link state, throttle policy, wire payload, settings
//! - [`infrastructure`] - Transport and geocoder collaborators, the link
//!   session actor, logging, simulated sensors
//! - [`presentation`] - Console front-end

pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::aggregator::SensorAggregator;
pub use domain::models::{FusedReading, LinkState};
pub use infrastructure::link::{LinkHandle, LinkSessionManager};
