//! Routing orchestrator.
//!
//! [`Router::route`] runs one multi-waypoint request:
//!
//! 1. Lookup: each waypoint is snapped with a [`LevelEdgeFilter`] fixed at its
//!    level. Failures are collected per waypoint index; any failure ends the
//!    request with no paths.
//! 2. One search per leg over a shared [`QueryGraph`], with heading
//!    constraints on the first origin and on every destination.
//! 3. Each leg's paths get the leg's (origin, destination) levels and are
//!    turned into level-annotated point lists.
//!
//! The graph sits behind a read/write lock. A route computation holds the read
//! guard for its whole duration; mutation through [`Router::update`] takes the
//! write guard.

use crate::error::{Error, Result};
use crate::filter::{EdgeFilter, LevelEdgeFilter, Profile};
use crate::graph::{EdgeId, LevelGraph};
use crate::level::Level;
use crate::location_index::{LocationIndex, QueryResult};
use crate::point_list::PointList;
use crate::query_graph::QueryGraph;
use crate::request::RouteRequest;
use crate::response::{RouteFailure, RouteResponse, RoutedPath};
use crate::routing::{
    Algorithm, AlgorithmFactory, AlgorithmOptions, DefaultAlgorithmFactory, TraversalMode, Weighting,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Router configuration. Every field has a default, so partial JSON works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Upper bound on settled nodes per leg; requests may lower it
    pub max_visited_nodes: usize,
    /// Search used unless a request overrides it
    pub algorithm: Algorithm,
    /// Node-based or edge-based search
    pub traversal_mode: TraversalMode,
    /// Edge kinds a walker may use unless a request overrides it
    pub profile: Profile,
    /// Speed on footways and in elevators
    pub walking_speed_kmh: f64,
    /// Speed on stairs
    pub stairs_speed_kmh: f64,
    /// Weight added to edges that break a heading or pass-through constraint
    pub heading_penalty_secs: f64,
    /// Reject waypoint levels that no node of the graph carries
    pub validate_levels: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        let weighting = Weighting::default();
        Self {
            max_visited_nodes: usize::MAX,
            algorithm: Algorithm::default(),
            traversal_mode: TraversalMode::default(),
            profile: Profile::default(),
            walking_speed_kmh: weighting.walking_speed_kmh,
            stairs_speed_kmh: weighting.stairs_speed_kmh,
            heading_penalty_secs: weighting.heading_penalty_secs,
            validate_levels: true,
        }
    }
}

impl RouterOptions {
    /// Checks that speeds are positive and the heading penalty is not negative
    ///
    /// # Errors
    ///
    /// `InvalidArgument` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let speeds = [("walking_speed_kmh", self.walking_speed_kmh), ("stairs_speed_kmh", self.stairs_speed_kmh)];
        for (field, speed) in speeds {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(Error::InvalidArgument(format!("{field} must be finite and > 0, got {speed}")));
            }
        }
        if !(self.heading_penalty_secs.is_finite() && self.heading_penalty_secs >= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "heading_penalty_secs must be finite and >= 0, got {}",
                self.heading_penalty_secs
            )));
        }
        Ok(())
    }

    fn weighting(&self, profile: Profile) -> Weighting {
        Weighting {
            profile,
            walking_speed_kmh: self.walking_speed_kmh,
            stairs_speed_kmh: self.stairs_speed_kmh,
            heading_penalty_secs: self.heading_penalty_secs,
        }
    }
}

/// Graph plus the spatial index derived from it
struct RoutingState {
    graph: LevelGraph,
    index: LocationIndex,
}

/// Thread-safe routing facade over a frozen [`LevelGraph`]
pub struct Router {
    state: RwLock<RoutingState>,
    options: RouterOptions,
    factory: Box<dyn AlgorithmFactory>,
}

impl Router {
    /// Freezes `graph`, indexes it and wraps it for concurrent routing
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `options` fail [`RouterOptions::validate`].
    pub fn new(mut graph: LevelGraph, options: RouterOptions) -> Result<Self> {
        options.validate()?;
        graph.freeze();
        let index = LocationIndex::build(&graph)?;

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            levels = graph.known_levels().len(),
            "Router ready"
        );

        Ok(Self {
            state: RwLock::new(RoutingState { graph, index }),
            options,
            factory: Box::new(DefaultAlgorithmFactory),
        })
    }

    /// Replaces the search algorithm factory
    pub fn with_factory(mut self, factory: impl AlgorithmFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Configuration the router was built with
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Levels carried by any node of the graph
    pub fn known_levels(&self) -> Arc<HashSet<Level>> {
        self.state.read().graph.known_levels().clone()
    }

    /// Runs `f` against the graph under the read lock
    pub fn with_graph<T>(&self, f: impl FnOnce(&LevelGraph) -> T) -> T {
        f(&self.state.read().graph)
    }

    /// Mutates the graph under the write lock and rebuilds the spatial index.
    ///
    /// The graph stays frozen: level, kind, access and geometry edits are
    /// allowed, node or edge creation fails with `FrozenGraph`.
    pub fn update<T>(&self, f: impl FnOnce(&mut LevelGraph) -> Result<T>) -> Result<T> {
        let mut state = self.state.write();
        let value = f(&mut state.graph)?;
        state.index = LocationIndex::build(&state.graph)?;
        Ok(value)
    }

    /// Persists the graph
    pub fn flush(&self) -> Result<()> {
        self.state.write().graph.flush()
    }

    /// Unwraps the router, returning the graph
    pub fn into_graph(self) -> LevelGraph {
        self.state.into_inner().graph
    }

    /// Routes through every waypoint of `request` in order.
    ///
    /// Ordinary failures (lookup, visit limit, no connection) come back in
    /// [`RouteResponse::errors`].
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for fewer than two waypoints or a visit limit above
    ///   the configured one
    /// - `InvalidLevel` for a waypoint level the graph does not know
    /// - `EmptyPathList` / `NegativeTime` if the search breaks its contract
    /// - storage errors while reading the graph
    pub fn route(&self, request: &RouteRequest) -> Result<RouteResponse> {
        let waypoints = &request.waypoints;
        if waypoints.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "at least 2 waypoints are required, got {}",
                waypoints.len()
            )));
        }

        let max_visited_nodes = match request.max_visited_nodes {
            Some(max) if max > self.options.max_visited_nodes => {
                return Err(Error::InvalidArgument(format!(
                    "max_visited_nodes {max} exceeds the configured limit {}",
                    self.options.max_visited_nodes
                )));
            }
            Some(max) => max,
            None => self.options.max_visited_nodes,
        };
        let profile = request.profile.unwrap_or(self.options.profile);

        let state = self.state.read();
        let graph = &state.graph;

        let known = graph.known_levels();
        let validate = self.options.validate_levels && !known.is_empty();
        let filters = waypoints
            .iter()
            .map(|wp| {
                if validate {
                    LevelEdgeFilter::with_known_levels(wp.level.clone(), Arc::clone(known))
                } else {
                    Ok(LevelEdgeFilter::new(wp.level.clone()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        // Lookup: failures are batched, not fail-fast
        let bounds = graph.bounds();
        let mut results = Vec::with_capacity(waypoints.len());
        let mut errors = Vec::new();
        for (index, (waypoint, filter)) in waypoints.iter().zip(filters).enumerate() {
            if !bounds.contains(waypoint.lat, waypoint.lon) {
                tracing::debug!(index, lat = waypoint.lat, lon = waypoint.lon, "Waypoint out of bounds");
                errors.push(RouteFailure::PointOutOfBounds { index });
                results.push(QueryResult::invalid(waypoint.lat, waypoint.lon));
                continue;
            }

            let result = state.index.find_closest(graph, waypoint.lat, waypoint.lon, &filter.and(profile))?;
            if !result.is_valid() {
                tracing::debug!(index, level = %waypoint.level, "No edge found for waypoint");
                errors.push(RouteFailure::PointNotFound { index });
            }
            results.push(result);
        }

        if !errors.is_empty() {
            return Ok(RouteResponse::failed(errors));
        }

        let mut query_graph = QueryGraph::new(graph, &mut results)?;
        let options = AlgorithmOptions {
            algorithm: request.algorithm.unwrap_or(self.options.algorithm),
            traversal_mode: self.options.traversal_mode,
            max_visited_nodes,
            weighting: self.options.weighting(profile),
        };

        let mut response = RouteResponse::default();
        for (waypoint, result) in waypoints.iter().zip(&results) {
            response.waypoints.add_point(result.snapped_point, waypoint.level.clone());
        }

        let legs = waypoints.len() - 1;
        let mut arrival_edge: Option<EdgeId> = None;

        for leg in 0..legs {
            let (origin, destination) = (&waypoints[leg], &waypoints[leg + 1]);
            let from = results[leg].closest_node;
            let to = results[leg + 1].closest_node;

            if leg == 0 {
                query_graph.enforce_heading(from, origin.heading.degrees(), false)?;
            }
            query_graph.enforce_heading(to, destination.heading.degrees(), true)?;
            if request.pass_through {
                if let Some(edge) = arrival_edge {
                    query_graph.unfavor_edge(from, edge);
                }
            }

            let (mut paths, visited, name) = {
                let mut algorithm = self.factory.create(&query_graph, &options);
                let paths = algorithm.calc_paths(from, to)?;
                (paths, algorithm.visited_nodes(), algorithm.name().to_string())
            };

            if paths.is_empty() {
                return Err(Error::EmptyPathList { leg, from, to });
            }
            for (index, path) in paths.iter().enumerate() {
                if path.time_ms() < 0 {
                    return Err(Error::NegativeTime { leg, index, time_ms: path.time_ms() });
                }
            }
            for path in &mut paths {
                path.set_levels(origin.level.clone(), destination.level.clone());
            }

            query_graph.clear_unfavored_status();
            response.visited_nodes_sum += visited;
            response.debug_info.push(format!("{name}: leg {leg} visited {visited} nodes"));
            tracing::debug!(leg, from, to, visited, algorithm = %name, "Leg searched");

            if visited >= max_visited_nodes {
                tracing::info!(leg, visited, max = max_visited_nodes, "Maximum visited nodes exceeded");
                return Ok(abort(response, leg + 1, RouteFailure::MaxVisitedNodesExceeded {
                    max: max_visited_nodes,
                }));
            }

            let path = paths.swap_remove(0);
            if !path.is_found() {
                return Ok(abort(response, leg + 1, RouteFailure::ConnectionNotFound));
            }

            arrival_edge = path.edges().last().copied();
            let points = path.calc_points(&query_graph)?;
            response.distance += path.distance();
            response.time_ms += path.time_ms();
            response.paths.push(RoutedPath { path, points });
        }

        query_graph.clear_unfavored_status();
        response.visited_nodes_average = response.visited_nodes_sum as f64 / legs as f64;
        response.points = merge_points(&response.paths);
        Ok(response)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("options", &self.options).finish_non_exhaustive()
    }
}

/// Turns a partially built response into a single failure, keeping diagnostics
fn abort(response: RouteResponse, legs_run: usize, failure: RouteFailure) -> RouteResponse {
    RouteResponse {
        visited_nodes_average: response.visited_nodes_sum as f64 / legs_run as f64,
        visited_nodes_sum: response.visited_nodes_sum,
        debug_info: response.debug_info,
        errors: vec![failure],
        ..RouteResponse::default()
    }
}

/// Concatenates leg geometries, dropping each later leg's first point
fn merge_points(paths: &[RoutedPath]) -> PointList {
    let mut merged = PointList::new();
    for (i, routed) in paths.iter().enumerate() {
        if i == 0 || routed.points.is_empty() {
            merged.add_list(&routed.points);
        } else {
            merged.add_list(&routed.points.copy(1, routed.points.len()));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RouterOptions::default();
        assert_eq!(options.max_visited_nodes, usize::MAX);
        assert_eq!(options.algorithm, Algorithm::AStar);
        assert_eq!(options.walking_speed_kmh, 5.0);
        assert_eq!(options.stairs_speed_kmh, 2.0);
        assert!(options.validate_levels);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_reject_bad_speeds_and_penalty() {
        let bad = [
            RouterOptions { walking_speed_kmh: 0.0, ..RouterOptions::default() },
            RouterOptions { stairs_speed_kmh: -1.0, ..RouterOptions::default() },
            RouterOptions { walking_speed_kmh: f64::NAN, ..RouterOptions::default() },
            RouterOptions { heading_penalty_secs: -0.5, ..RouterOptions::default() },
        ];
        for options in bad {
            assert!(matches!(options.validate(), Err(Error::InvalidArgument(_))), "{options:?}");
        }

        let no_penalty = RouterOptions { heading_penalty_secs: 0.0, ..RouterOptions::default() };
        assert!(no_penalty.validate().is_ok());
    }

    #[test]
    fn test_merge_drops_junction_point() {
        let mut first = PointList::new();
        first.add(0.0, 0.0, Level::new("0"));
        first.add(0.0, 1.0, Level::new("1"));
        let mut second = PointList::new();
        second.add(0.0, 1.0, Level::new("1"));
        second.add(0.0, 2.0, Level::new("1"));

        let paths = vec![
            RoutedPath { path: crate::Path::not_found(0, 1), points: first },
            RoutedPath { path: crate::Path::not_found(1, 2), points: second },
        ];
        let merged = merge_points(&paths);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.lon(2), 2.0);
    }
}
