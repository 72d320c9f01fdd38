//! Route request types.

use crate::error::{Error, Result};
use crate::filter::Profile;
use crate::geo::GeoPoint;
use crate::level::Level;
use crate::routing::Algorithm;
use serde::{Deserialize, Serialize};

/// Favored travel direction in degrees, or no preference.
///
/// Valid values are NaN ("no preference") and `[0, 360]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Option<f64>", into = "Option<f64>")]
pub struct Heading(f64);

impl Heading {
    /// No directional preference
    pub const NONE: Heading = Heading(f64::NAN);

    /// # Errors
    ///
    /// `InvalidHeading` for values outside `[0, 360]` (NaN is accepted as
    /// "no preference").
    pub fn new(degrees: f64) -> Result<Self> {
        if degrees.is_nan() || (0.0..=360.0).contains(&degrees) {
            Ok(Self(degrees))
        } else {
            Err(Error::InvalidHeading(degrees))
        }
    }

    /// Degrees, or NaN without preference
    pub fn degrees(&self) -> f64 {
        self.0
    }

    /// True without heading preference
    pub fn is_none(&self) -> bool {
        self.0.is_nan()
    }
}

impl Default for Heading {
    fn default() -> Self {
        Self::NONE
    }
}

impl TryFrom<Option<f64>> for Heading {
    type Error = Error;

    fn try_from(value: Option<f64>) -> Result<Self> {
        value.map_or(Ok(Self::NONE), Self::new)
    }
}

impl From<Heading> for Option<f64> {
    fn from(heading: Heading) -> Self {
        if heading.is_none() { None } else { Some(heading.0) }
    }
}

/// A point of a trip together with the level it is on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Level the waypoint is on; lookup only snaps onto edges touching it
    pub level: Level,
    /// Favored heading, none by default
    #[serde(default)]
    pub heading: Heading,
}

impl Waypoint {
    /// A waypoint without heading preference
    pub fn new(lat: f64, lon: f64, level: impl Into<Level>) -> Self {
        Self { lat, lon, level: level.into(), heading: Heading::NONE }
    }

    /// Adds a favored heading
    ///
    /// # Errors
    ///
    /// `InvalidHeading` for values outside `[0, 360]`.
    pub fn with_heading(mut self, degrees: f64) -> Result<Self> {
        self.heading = Heading::new(degrees)?;
        Ok(self)
    }

    /// Coordinates of the waypoint
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// An ordered multi-waypoint trip with per-request overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRequest {
    /// Waypoints in visiting order, at least two
    pub waypoints: Vec<Waypoint>,
    /// Overrides the configured algorithm
    pub algorithm: Option<Algorithm>,
    /// Overrides the configured profile
    pub profile: Option<Profile>,
    /// Lowers the configured visit limit (may not raise it)
    pub max_visited_nodes: Option<usize>,
    /// At via points, avoid leaving on the edge the previous leg arrived on
    pub pass_through: bool,
}

impl RouteRequest {
    /// A request with default overrides
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints, ..Self::default() }
    }

    /// Appends a waypoint after the current destination
    pub fn add_waypoint(mut self, waypoint: Waypoint) -> Self {
        self.waypoints.push(waypoint);
        self
    }

    /// Selects the search algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Selects the access profile
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Lowers the visit limit
    pub fn with_max_visited_nodes(mut self, max: usize) -> Self {
        self.max_visited_nodes = Some(max);
        self
    }

    /// Enables pass-through at via points
    pub fn with_pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = pass_through;
        self
    }
}
