//! Route response types.

use crate::path::Path;
use crate::point_list::PointList;
use serde::Serialize;
use std::fmt;

/// An ordinary request failure, reported inside a [`RouteResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteFailure {
    /// No edge within snapping range of the waypoint
    #[error("Cannot find point {index}")]
    PointNotFound { index: usize },

    /// Waypoint outside the graph bounds
    #[error("Point {index} is out of bounds")]
    PointOutOfBounds { index: usize },

    /// Search gave up at the visited-node limit
    #[error("No path found due to maximum nodes exceeded {max}")]
    MaxVisitedNodesExceeded { max: usize },

    /// Search finished without reaching the target
    #[error("Connection between locations not found")]
    ConnectionNotFound,
}

impl RouteFailure {
    /// Waypoint index for lookup failures
    pub fn point_index(&self) -> Option<usize> {
        match self {
            Self::PointNotFound { index } | Self::PointOutOfBounds { index } => Some(*index),
            _ => None,
        }
    }
}

/// One leg's path with its level-annotated geometry
#[derive(Debug, Clone, Serialize)]
pub struct RoutedPath {
    /// Search result for the leg
    pub path: Path,
    /// Level-annotated geometry of the leg
    pub points: PointList,
}

impl RoutedPath {
    /// Length of the leg in meters
    pub fn distance(&self) -> f64 {
        self.path.distance()
    }

    /// Travel time of the leg in milliseconds
    pub fn time_ms(&self) -> i64 {
        self.path.time_ms()
    }
}

/// Outcome of [`Router::route`](crate::Router::route)
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteResponse {
    /// One path per leg, in waypoint order
    pub paths: Vec<RoutedPath>,
    /// All legs concatenated, junction duplicates dropped
    pub points: PointList,
    /// Snapped waypoints with their requested levels
    pub waypoints: PointList,
    /// Total length in meters
    pub distance: f64,
    /// Total travel time in milliseconds
    pub time_ms: i64,
    /// Nodes settled over all legs
    pub visited_nodes_sum: usize,
    /// Settled nodes per leg
    pub visited_nodes_average: f64,
    /// One line per searched leg
    pub debug_info: Vec<String>,
    /// Ordinary failures; empty on success
    pub errors: Vec<RouteFailure>,
}

impl RouteResponse {
    /// True if any failure was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True if every leg produced a found path and no error was recorded
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.paths.is_empty()
    }

    pub(crate) fn failed(errors: Vec<RouteFailure>) -> Self {
        Self { errors, ..Self::default() }
    }
}

impl fmt::Display for RouteResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_errors() {
            let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            return write!(f, "route failed: {}", messages.join("; "));
        }
        write!(
            f,
            "{} legs, {:.1} m, {} ms, {} points",
            self.paths.len(),
            self.distance,
            self.time_ms,
            self.points.len()
        )
    }
}
