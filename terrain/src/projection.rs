//! Spherical Web Mercator projection (EPSG:3857 <-> EPSG:4326).
//!
//! Closed-form conversions between WGS84 latitude/longitude in decimal
//! degrees and Web Mercator meters on a sphere of radius [`EARTH_RADIUS`].

use std::f64::consts::PI;

/// Equatorial radius of the WGS84 ellipsoid, used as the sphere radius.
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Half the circumference of the projection sphere (meters at lon = 180°).
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Converts WGS84 latitude/longitude to Web Mercator meters.
///
/// Defined for all finite inputs; the result is only meaningful for
/// latitudes strictly between -90° and 90°.
///
/// # Examples
///
/// ```
/// use terrain::projection::{to_mercator, ORIGIN_SHIFT};
///
/// let (x, y) = to_mercator(0.0, 180.0);
/// assert!((x - ORIGIN_SHIFT).abs() < 1e-6);
/// assert!(y.abs() < 1e-6);
/// ```
pub fn to_mercator(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon * ORIGIN_SHIFT / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    (x, y * ORIGIN_SHIFT / 180.0)
}

/// Converts Web Mercator meters to WGS84 latitude/longitude.
///
/// Returns `(lat, lon)` in decimal degrees.
pub fn to_lat_lon(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / ORIGIN_SHIFT) * 180.0;
    let lat = (y / ORIGIN_SHIFT) * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lat, lon)
}
