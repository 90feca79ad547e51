//! Pure distance and ETA estimation functions.
//!
//! Everything in here is side-effect free and deterministic: great-circle
//! distance between two coordinates, a padded travel-time estimate for a
//! courier, and human-readable countdown labels. Callers are expected to
//! validate coordinate ranges before calling in; this module has no error
//! type of its own.

/// Mean Earth radius in kilometers, used by the haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average courier speed in km/h.
const COURIER_SPEED_KMH: f64 = 30.0;

/// Great-circle distance between two points, in kilometers.
///
/// Uses the haversine formula. Symmetric in its arguments and returns 0.0
/// for identical points. Valid for latitudes in [-90, 90] and longitudes
/// in [-180, 180].
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimated delivery time in seconds for a courier at the given distance.
///
/// Raw travel time at 30 km/h, rounded up to whole minutes (minimum 1),
/// plus a buffer that absorbs real-world variance: 5 minutes under 2 km,
/// 10 minutes under 5 km, 15 minutes beyond. Never less than 60 seconds.
pub fn estimated_seconds(distance_km: f64) -> u64 {
    let travel_minutes = (distance_km / COURIER_SPEED_KMH * 60.0).ceil().max(1.0) as u64;

    let buffer_minutes = if distance_km < 2.0 {
        5
    } else if distance_km < 5.0 {
        10
    } else {
        15
    };

    ((travel_minutes + buffer_minutes) * 60).max(60)
}

/// Human-readable countdown label for a remaining-seconds value.
///
/// The mapping is fixed and locale-free:
/// - `<= 0` -> "arriving now"
/// - `<= 60` -> "N seconds remaining"
/// - `<= 300` -> "m:ss minutes"
/// - `<= 1800` -> "N minutes" (rounded up)
/// - otherwise -> "H hours M minutes"
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        "arriving now".to_string()
    } else if seconds <= 60 {
        format!("{} seconds remaining", seconds)
    } else if seconds <= 300 {
        format!("{}:{:02} minutes", seconds / 60, seconds % 60)
    } else if seconds <= 1800 {
        format!("{} minutes", (seconds + 59) / 60)
    } else {
        format!("{} hours {} minutes", seconds / 3600, (seconds % 3600) / 60)
    }
}
