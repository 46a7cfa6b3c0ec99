//! Planar distance approximation tuned for walkable ranges.
//!
//! Distances are computed on a flat projection: one degree of latitude is
//! taken as 111 km and longitude degrees are shortened by a fixed
//! mid-latitude factor of 0.7. Over a few hundred meters the error against
//! great-circle distance is negligible, and the clustering thresholds were
//! tuned against exactly this approximation, so it is part of the contract
//! rather than an implementation detail.

use crate::LatLon;

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_000.0;

/// Fixed longitude shortening applied on top of the latitude factor.
pub const LON_CORRECTION: f64 = 0.7;

/// Approximate distance in meters between two coordinates.
///
/// # Example
///
/// ```
/// use stop_cluster::distance::planar_distance;
/// use stop_cluster::LatLon;
///
/// let a = LatLon::new(51.5074, -0.1278);
/// let b = LatLon::new(51.5079, -0.1278);
/// let d = planar_distance(a, b);
/// assert!((d - 55.5).abs() < 0.1);
/// ```
#[inline]
pub fn planar_distance(a: LatLon, b: LatLon) -> f64 {
    let lat_diff = (b.latitude - a.latitude).abs() * METERS_PER_DEGREE_LAT;
    let lon_diff = (b.longitude - a.longitude).abs() * METERS_PER_DEGREE_LAT * LON_CORRECTION;
    (lat_diff * lat_diff + lon_diff * lon_diff).sqrt()
}

/// Total distance in meters walking the coordinates in slice order.
///
/// Returns 0.0 for fewer than two coordinates.
#[inline]
pub fn path_length(points: &[LatLon]) -> f64 {
    points
        .windows(2)
        .map(|pair| planar_distance(pair[0], pair[1]))
        .sum()
}

/// Degree half-widths of a bounding box guaranteed to contain every point
/// within `meters` of its center. Returns `(lat_radius, lng_radius)`.
///
/// The box is conservative: anything outside it is strictly farther than
/// `meters` away under [`planar_distance`].
#[inline]
pub(crate) fn degree_radius(meters: f64) -> (f64, f64) {
    (
        meters / METERS_PER_DEGREE_LAT,
        meters / (METERS_PER_DEGREE_LAT * LON_CORRECTION),
    )
}
