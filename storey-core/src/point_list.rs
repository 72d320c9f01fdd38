//! Coordinates with a level per point.

use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinates closer than this (degrees) compare equal
const COORD_EPSILON: f64 = 1e-9;

/// Ordered points, each carrying the level it lies on.
///
/// Equality compares coordinates (within 1e-9 degrees) and levels exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointList {
    lats: Vec<f64>,
    lons: Vec<f64>,
    levels: Vec<Level>,
}

impl PointList {
    /// An empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty list with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lats: Vec::with_capacity(capacity),
            lons: Vec::with_capacity(capacity),
            levels: Vec::with_capacity(capacity),
        }
    }

    /// Builds a list from parallel point and level sequences
    ///
    /// # Errors
    ///
    /// `PointListMismatch` if the lengths differ.
    pub fn from_points_and_levels(points: &[GeoPoint], levels: &[Level]) -> Result<Self> {
        if points.len() != levels.len() {
            return Err(Error::PointListMismatch { points: points.len(), levels: levels.len() });
        }
        let mut list = Self::with_capacity(points.len());
        for (point, level) in points.iter().zip(levels) {
            list.add(point.lat, point.lon, level.clone());
        }
        Ok(list)
    }

    /// Appends a point
    pub fn add(&mut self, lat: f64, lon: f64, level: Level) {
        self.lats.push(lat);
        self.lons.push(lon);
        self.levels.push(level);
    }

    /// Appends a [`GeoPoint`]
    pub fn add_point(&mut self, point: GeoPoint, level: Level) {
        self.add(point.lat, point.lon, level);
    }

    /// Appends every point of `other`
    pub fn add_list(&mut self, other: &PointList) {
        self.lats.extend_from_slice(&other.lats);
        self.lons.extend_from_slice(&other.lons);
        self.levels.extend_from_slice(&other.levels);
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.lats.len()
    }

    /// True if the list holds no points
    pub fn is_empty(&self) -> bool {
        self.lats.is_empty()
    }

    /// Latitude of point `index`
    pub fn lat(&self, index: usize) -> f64 {
        self.lats[index]
    }

    /// Longitude of point `index`
    pub fn lon(&self, index: usize) -> f64 {
        self.lons[index]
    }

    /// Level of point `index`
    pub fn level(&self, index: usize) -> &Level {
        &self.levels[index]
    }

    /// Coordinates of point `index`
    pub fn point(&self, index: usize) -> GeoPoint {
        GeoPoint::new(self.lats[index], self.lons[index])
    }

    /// Levels of all points, in order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Level of the final point
    pub fn last_level(&self) -> Option<&Level> {
        self.levels.last()
    }

    /// Overwrites the level of a point
    pub fn set_level(&mut self, index: usize, level: Level) {
        self.levels[index] = level;
    }

    /// Iterates over points with their levels
    pub fn iter(&self) -> impl Iterator<Item = (GeoPoint, &Level)> + '_ {
        (0..self.len()).map(move |i| (self.point(i), &self.levels[i]))
    }

    /// Reverses points and levels together
    pub fn reverse(&mut self) {
        self.lats.reverse();
        self.lons.reverse();
        self.levels.reverse();
    }

    /// Copy of the points in `[from, end)`
    pub fn copy(&self, from: usize, end: usize) -> Self {
        assert!(from <= end && end <= self.len(), "Invalid range {from}..{end} for {} points", self.len());
        Self {
            lats: self.lats[from..end].to_vec(),
            lons: self.lons[from..end].to_vec(),
            levels: self.levels[from..end].to_vec(),
        }
    }

    /// Drops the final point
    pub fn remove_last(&mut self) {
        self.lats.pop();
        self.lons.pop();
        self.levels.pop();
    }

    /// Keeps the first `len` points
    pub fn trim_to(&mut self, len: usize) {
        self.lats.truncate(len);
        self.lons.truncate(len);
        self.levels.truncate(len);
    }

    /// Removes every point
    pub fn clear(&mut self) {
        self.trim_to(0);
    }
}

impl PartialEq for PointList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && (0..self.len()).all(|i| {
                (self.lats[i] - other.lats[i]).abs() <= COORD_EPSILON
                    && (self.lons[i] - other.lons[i]).abs() <= COORD_EPSILON
                    && self.levels[i] == other.levels[i]
            })
    }
}

impl fmt::Display for PointList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({},{}, {})", self.lats[i], self.lons[i], self.levels[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointList {
        let mut list = PointList::new();
        list.add(1.0, 1.0, Level::new("0"));
        list.add(2.0, 2.0, Level::new("0"));
        list.add(3.0, 3.0, Level::new("1"));
        list
    }

    #[test]
    fn test_equality_includes_levels() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a, b);

        b.set_level(2, Level::new("2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_tolerates_rounding() {
        let a = sample();
        let mut b = PointList::new();
        b.add(1.0 + 1e-12, 1.0, Level::new("0"));
        b.add(2.0, 2.0, Level::new("0"));
        b.add(3.0, 3.0 - 1e-12, Level::new("1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_reverse_keeps_levels_attached() {
        let mut list = sample();
        list.reverse();
        assert_eq!(list.lat(0), 3.0);
        assert_eq!(list.level(0).as_str(), "1");
        assert_eq!(list.level(2).as_str(), "0");
    }

    #[test]
    fn test_copy_and_trim() {
        let list = sample();
        let tail = list.copy(1, 3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.level(1).as_str(), "1");

        let mut head = list.clone();
        head.trim_to(1);
        assert_eq!(head.len(), 1);
        head.remove_last();
        assert!(head.is_empty());
    }

    #[test]
    fn test_mismatched_construction() {
        let points = [GeoPoint::new(0.0, 0.0)];
        let err = PointList::from_points_and_levels(&points, &[]).unwrap_err();
        assert!(matches!(err, Error::PointListMismatch { points: 1, levels: 0 }));
    }

    #[test]
    fn test_display() {
        let mut list = PointList::new();
        list.add(1.5, 2.5, Level::new("UG"));
        assert_eq!(list.to_string(), "(1.5,2.5, UG)");
    }
}
