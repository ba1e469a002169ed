use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average driving speed between stops, in km/h.
const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Flat per-leg overhead (parking, walking in) in minutes.
const LEG_BUFFER_MINUTES: f64 = 5.0;

/// A WGS84 point in degrees. Latitude in ±90, longitude in ±180.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance between two points in kilometers.
///
/// Out-of-range coordinates are not rejected; the result is then meaningless
/// but finite (garbage in, garbage out).
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Estimated driving time for a leg of the given length, in whole minutes.
///
/// Fixed 30 km/h average plus a flat 5-minute buffer, rounded to the nearest
/// minute. A deliberately crude placeholder with no traffic or road-network
/// modeling; callers wanting measured times go through the mapping provider.
#[must_use]
pub fn driving_minutes(distance_km: f64) -> u32 {
    let minutes = distance_km / AVERAGE_SPEED_KMH * 60.0 + LEG_BUFFER_MINUTES;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        minutes.round().max(0.0) as u32
    }
}
