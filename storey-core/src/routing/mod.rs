//! Shortest-path search over a query graph.
//!
//! The orchestrator only talks to [`AlgorithmFactory`] and
//! [`RoutingAlgorithm`]; [`DefaultAlgorithmFactory`] provides Dijkstra and
//! A* over node- or edge-based traversal.

mod dijkstra;

pub use dijkstra::ShortestPath;

use crate::edge::{EdgeKind, EdgeState};
use crate::error::Result;
use crate::filter::{EdgeFilter, Profile};
use crate::graph::NodeId;
use crate::path::Path;
use crate::query_graph::QueryGraph;
use serde::{Deserialize, Serialize};

/// Search algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Uninformed search
    Dijkstra,
    /// Dijkstra guided by a great-circle lower bound
    #[default]
    AStar,
}

/// What a search settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Each node once
    #[default]
    NodeBased,
    /// Each directed edge once; immediate U-turns are forbidden
    EdgeBased,
}

/// Converts edges to travel time and search weight
#[derive(Debug, Clone, PartialEq)]
pub struct Weighting {
    /// Edge kinds admitted during search
    pub profile: Profile,
    /// Speed on footways and in elevators, km/h
    pub walking_speed_kmh: f64,
    /// Speed on stairs, km/h
    pub stairs_speed_kmh: f64,
    /// Added to the weight (never the time) of unfavored edges
    pub heading_penalty_secs: f64,
}

impl Default for Weighting {
    fn default() -> Self {
        Self {
            profile: Profile::Indoor,
            walking_speed_kmh: 5.0,
            stairs_speed_kmh: 2.0,
            heading_penalty_secs: 300.0,
        }
    }
}

impl Weighting {
    /// Speed for an edge kind in km/h
    pub fn speed_kmh(&self, kind: EdgeKind) -> f64 {
        match kind {
            EdgeKind::Footway | EdgeKind::Elevator => self.walking_speed_kmh,
            EdgeKind::Stairs => self.stairs_speed_kmh,
        }
    }

    /// Highest speed any admitted edge can have
    pub fn max_speed_kmh(&self) -> f64 {
        self.walking_speed_kmh.max(self.stairs_speed_kmh)
    }

    /// Travel time of an edge in milliseconds
    pub fn time_ms(&self, edge: &EdgeState<'_>) -> i64 {
        let secs = edge.distance() / (self.speed_kmh(edge.kind()) / 3.6);
        (secs * 1000.0).round() as i64
    }

    /// Search weight of an edge in seconds
    pub fn weight(&self, edge: &EdgeState<'_>) -> f64 {
        let secs = edge.distance() / (self.speed_kmh(edge.kind()) / 3.6);
        if edge.is_unfavored() { secs + self.heading_penalty_secs } else { secs }
    }

    /// Lower bound of the weight per meter, for the A* heuristic
    pub fn min_weight_per_meter(&self) -> f64 {
        3.6 / self.max_speed_kmh()
    }
}

impl EdgeFilter for Weighting {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        self.profile.accept(edge) && self.speed_kmh(edge.kind()) > 0.0
    }
}

/// Per-search options handed to an [`AlgorithmFactory`]
#[derive(Debug, Clone)]
pub struct AlgorithmOptions {
    /// Dijkstra or A*
    pub algorithm: Algorithm,
    /// Node-based or edge-based
    pub traversal_mode: TraversalMode,
    /// The search stops once this many nodes are settled
    pub max_visited_nodes: usize,
    /// Edge costs and admission
    pub weighting: Weighting,
}

impl Default for AlgorithmOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            traversal_mode: TraversalMode::default(),
            max_visited_nodes: usize::MAX,
            weighting: Weighting::default(),
        }
    }
}

/// A single-use point-to-point search
pub trait RoutingAlgorithm {
    /// Paths from `from` to `to`, best first.
    ///
    /// A disconnected pair or an exhausted visit budget yields one path with
    /// `found == false`, never an empty list.
    fn calc_paths(&mut self, from: NodeId, to: NodeId) -> Result<Vec<Path>>;

    /// Nodes settled by the last search
    fn visited_nodes(&self) -> usize;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

/// Creates search algorithms for a query graph
pub trait AlgorithmFactory: Send + Sync {
    fn create<'a>(
        &self,
        graph: &'a QueryGraph<'_>,
        options: &AlgorithmOptions,
    ) -> Box<dyn RoutingAlgorithm + 'a>;
}

/// Factory for the built-in Dijkstra and A* searches
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAlgorithmFactory;

impl AlgorithmFactory for DefaultAlgorithmFactory {
    fn create<'a>(
        &self,
        graph: &'a QueryGraph<'_>,
        options: &AlgorithmOptions,
    ) -> Box<dyn RoutingAlgorithm + 'a> {
        Box::new(ShortestPath::new(graph, options.clone()))
    }
}
