//! Geographic helpers: points, bounding boxes, great-circle distance and bearing.

use geo::{Bearing, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True if both coordinates are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    fn to_geo(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Great-circle distance in meters
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine::distance(a.to_geo(), b.to_geo())
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360)
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let raw = Haversine::bearing(a.to_geo(), b.to_geo());
    let normalized = raw.rem_euclid(360.0);
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Smallest absolute angle between two bearings, in [0, 180]
pub fn angle_delta(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Southern edge
    pub min_lat: f64,
    /// Northern edge
    pub max_lat: f64,
    /// Western edge
    pub min_lon: f64,
    /// Eastern edge
    pub max_lon: f64,
}

impl BBox {
    /// An inverted box that contains nothing and grows on `extend`
    pub const fn empty() -> Self {
        Self {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        }
    }

    /// True until a point has been added
    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }

    /// Grows the box to include `(lat, lon)`
    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Inclusive containment test
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Center latitude (0 for an empty box)
    pub fn center_lat(&self) -> f64 {
        if self.is_empty() { 0.0 } else { (self.min_lat + self.max_lat) / 2.0 }
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}
