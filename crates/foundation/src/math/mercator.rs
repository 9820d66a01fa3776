//! Spherical Web Mercator (`EPSG:3857`) on the WGS84 semi-major axis.

use std::f64::consts::PI;

use super::Vec2;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// Half the width of the Web Mercator square (meters).
pub const MERCATOR_HALF_EXTENT: f64 = PI * WGS84_A;

/// Latitude limit of the Web Mercator square (degrees).
pub const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Longitude/latitude in degrees to Web Mercator meters.
///
/// Latitude is clamped to the Mercator square so the poles map to finite
/// values.
pub fn lonlat_to_mercator(lonlat: Vec2) -> Vec2 {
    let lat = lonlat
        .y
        .clamp(-MERCATOR_MAX_LATITUDE, MERCATOR_MAX_LATITUDE)
        .to_radians();
    let x = WGS84_A * lonlat.x.to_radians();
    let y = WGS84_A * (PI / 4.0 + lat / 2.0).tan().ln();
    Vec2::new(x, y)
}

/// Web Mercator meters to longitude/latitude in degrees.
pub fn mercator_to_lonlat(merc: Vec2) -> Vec2 {
    let lon = (merc.x / WGS84_A).to_degrees();
    let lat = (2.0 * (merc.y / WGS84_A).exp().atan() - PI / 2.0).to_degrees();
    Vec2::new(lon, lat)
}
