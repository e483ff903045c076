pub mod geocoding;
pub mod link;
pub mod logging;
pub mod sensors;
pub mod transport;
