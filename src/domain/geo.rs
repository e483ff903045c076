//! Geodesy helpers
//!
//! Pure functions shared by the fused reading accessors and the lookup throttle.

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fold an angle in degrees into `[0, 360)`
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 {
        // tiny negatives round up to exactly 360.0
        let wrapped = a + 360.0;
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    } else {
        a
    }
}

/// Great-circle distance between two positions using the Haversine formula
///
/// # Arguments
///
/// * `lat1`, `lon1` - Start position in degrees
/// * `lat2`, `lon2` - End position in degrees
///
/// # Returns
///
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let sin_dlat = (delta_lat / 2.0).sin();
    let sin_dlon = (delta_lon / 2.0).sin();
    let a = sin_dlat * sin_dlat + lat1_rad.cos() * lat2_rad.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Move a position `meters` due north. Used to script walks in tests and
/// the simulated sensor feed.
pub fn offset_north(lat: f64, meters: f64) -> f64 {
    lat + (meters / EARTH_RADIUS_M).to_degrees()
}
