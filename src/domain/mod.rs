pub mod aggregator;
pub mod error;
pub mod geo;
pub mod models;
pub mod payload;
pub mod settings;
pub mod throttle;
