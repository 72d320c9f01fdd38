//! Search result paths and their level annotation.

use crate::edge::EdgeState;
use crate::error::{Error, Result};
use crate::graph::{EdgeId, NodeId};
use crate::level::Level;
use crate::point_list::PointList;
use crate::query_graph::QueryGraph;
use serde::Serialize;

/// Edge sequence found by one search, plus the level pair of its leg
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    from_node: NodeId,
    end_node: NodeId,
    edges: Vec<EdgeId>,
    /// `nodes[0] == from_node`; `nodes[i + 1]` is the adj node of `edges[i]`
    nodes: Vec<NodeId>,
    distance: f64,
    time_ms: i64,
    weight: f64,
    found: bool,
    levels: Option<(Level, Level)>,
}

impl Path {
    /// A path for a search that did not reach its target
    pub fn not_found(from: NodeId, to: NodeId) -> Self {
        Self {
            from_node: from,
            end_node: to,
            edges: Vec::new(),
            nodes: Vec::new(),
            distance: 0.0,
            time_ms: 0,
            weight: f64::INFINITY,
            found: false,
            levels: None,
        }
    }

    /// A found path. `nodes` must hold one more entry than `edges`.
    pub fn found(
        from: NodeId,
        to: NodeId,
        edges: Vec<EdgeId>,
        nodes: Vec<NodeId>,
        distance: f64,
        time_ms: i64,
        weight: f64,
    ) -> Self {
        debug_assert_eq!(nodes.len(), edges.len() + 1);
        Self {
            from_node: from,
            end_node: to,
            edges,
            nodes,
            distance,
            time_ms,
            weight,
            found: true,
            levels: None,
        }
    }

    /// Start node of the search
    pub fn from_node(&self) -> NodeId {
        self.from_node
    }

    /// Target node of the search
    pub fn end_node(&self) -> NodeId {
        self.end_node
    }

    /// Traversed edges, in order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Visited nodes, one more than edges
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Length in meters
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Travel time in milliseconds
    pub fn time_ms(&self) -> i64 {
        self.time_ms
    }

    /// Search weight (time plus penalties)
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// False if the search did not reach its target
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Declares the (origin, destination) levels of the leg this path belongs to
    pub fn set_levels(&mut self, origin: Level, destination: Level) {
        self.levels = Some((origin, destination));
    }

    /// Origin and destination levels of the leg, once set
    pub fn levels(&self) -> Option<(&Level, &Level)> {
        self.levels.as_ref().map(|(o, d)| (o, d))
    }

    /// Resolves the edge ids into handles oriented along the path
    pub fn calc_edges<'a>(&self, graph: &'a QueryGraph<'_>) -> Result<Vec<EdgeState<'a>>> {
        if self.nodes.len() != self.edges.len() + 1 && !self.edges.is_empty() {
            return Err(Error::Corrupt(format!(
                "path has {} edges but {} nodes",
                self.edges.len(),
                self.nodes.len()
            )));
        }
        self.edges
            .iter()
            .zip(self.nodes.iter().skip(1))
            .map(|(&edge, &adj)| graph.edge_state(edge, adj))
            .collect()
    }

    /// Geometry of the path with a level on every point.
    ///
    /// Each edge contributes its base point and pillars. A stored edge tags
    /// them with its base node's level. A virtual edge has no level: it takes
    /// the origin level as the first edge, the destination level as the last
    /// edge and otherwise the level of the preceding point. The end node is
    /// appended last and always carries the destination level.
    pub fn calc_points(&self, graph: &QueryGraph<'_>) -> Result<PointList> {
        if !self.found {
            return Ok(PointList::new());
        }

        let (origin, destination) = match &self.levels {
            Some((o, d)) => (o.clone(), d.clone()),
            None => (Level::unset(), Level::unset()),
        };

        let edges = self.calc_edges(graph)?;
        let mut points = PointList::with_capacity(edges.len() * 2 + 1);
        let last = edges.len().saturating_sub(1);

        for (i, edge) in edges.iter().enumerate() {
            let level = if edge.level_aware().is_some() {
                Level::new(graph.base_graph().node_level(edge.base_node())?)
            } else if i == 0 {
                origin.clone()
            } else if i == last {
                destination.clone()
            } else {
                points.last_level().cloned().unwrap_or_else(|| origin.clone())
            };

            points.add_point(graph.node_point(edge.base_node())?, level.clone());
            for pillar in edge.pillars()? {
                points.add_point(pillar, level.clone());
            }
        }

        points.add_point(graph.node_point(self.end_node)?, destination);
        Ok(points)
    }
}
