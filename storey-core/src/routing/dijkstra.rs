use super::{Algorithm, AlgorithmOptions, RoutingAlgorithm, TraversalMode};
use crate::edge::EdgeState;
use crate::error::Result;
use crate::filter::EdgeFilter;
use crate::geo::{GeoPoint, haversine_distance};
use crate::graph::{EdgeId, NodeId};
use crate::path::Path;
use crate::query_graph::QueryGraph;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Settled-or-tentative search state: (incoming edge, node).
/// Node-based traversal always uses `None` for the edge.
type TraversalKey = (Option<EdgeId>, NodeId);

/// Shortest-path-tree entry
#[derive(Debug, Clone, Copy)]
struct SptEntry {
    node: NodeId,
    edge: Option<EdgeId>,
    parent: Option<usize>,
    weight: f64,
    distance: f64,
    time_ms: i64,
}

/// Heap candidate ordered by priority (weight plus heuristic)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    priority: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.total_cmp(&other.priority)
    }
}

/// Dijkstra, or A* with a great-circle heuristic, over a [`QueryGraph`]
pub struct ShortestPath<'a> {
    graph: &'a QueryGraph<'a>,
    options: AlgorithmOptions,
    visited: usize,
}

impl<'a> ShortestPath<'a> {
    /// A search over `graph`; runs on [`calc_paths`](RoutingAlgorithm::calc_paths)
    pub fn new(graph: &'a QueryGraph<'a>, options: AlgorithmOptions) -> Self {
        Self { graph, options, visited: 0 }
    }

    fn key(&self, edge: Option<EdgeId>, node: NodeId) -> TraversalKey {
        match self.options.traversal_mode {
            TraversalMode::NodeBased => (None, node),
            TraversalMode::EdgeBased => (edge, node),
        }
    }

    fn heuristic(&self, node: NodeId, target: GeoPoint) -> Result<f64> {
        match self.options.algorithm {
            Algorithm::Dijkstra => Ok(0.0),
            Algorithm::AStar => {
                let point = self.graph.node_point(node)?;
                Ok(haversine_distance(point, target) * self.options.weighting.min_weight_per_meter())
            }
        }
    }

    fn calc_path(&mut self, from: NodeId, to: NodeId) -> Result<Path> {
        self.visited = 0;
        let target = self.graph.node_point(to)?;

        let mut spt = vec![SptEntry {
            node: from,
            edge: None,
            parent: None,
            weight: 0.0,
            distance: 0.0,
            time_ms: 0,
        }];
        let mut best: HashMap<TraversalKey, usize> = HashMap::new();
        let mut settled: HashSet<TraversalKey> = HashSet::new();
        let mut heap = BinaryHeap::new();
        let mut edges: Vec<EdgeState<'a>> = Vec::new();

        best.insert(self.key(None, from), 0);
        heap.push(Reverse(Candidate { priority: self.heuristic(from, target)?, index: 0 }));

        while let Some(Reverse(Candidate { index, .. })) = heap.pop() {
            let current = spt[index];
            if !settled.insert(self.key(current.edge, current.node)) {
                continue;
            }
            self.visited += 1;

            if current.node == to {
                return self.extract(&spt, index, from, to);
            }
            if self.visited >= self.options.max_visited_nodes {
                tracing::info!(
                    from,
                    to,
                    visited = self.visited,
                    max = self.options.max_visited_nodes,
                    "Search stopped at visited node limit"
                );
                return Ok(Path::not_found(from, to));
            }

            self.graph.edges_at(current.node, &mut edges)?;
            for edge in &edges {
                if !edge.is_forward() || !self.options.weighting.accept(edge) {
                    continue;
                }
                if self.options.traversal_mode == TraversalMode::EdgeBased
                    && current.edge == Some(edge.edge())
                {
                    continue;
                }

                let key = self.key(Some(edge.edge()), edge.adj_node());
                if settled.contains(&key) {
                    continue;
                }

                let weight = current.weight + self.options.weighting.weight(edge);
                if let Some(&existing) = best.get(&key) {
                    if spt[existing].weight <= weight {
                        continue;
                    }
                }

                let next = spt.len();
                spt.push(SptEntry {
                    node: edge.adj_node(),
                    edge: Some(edge.edge()),
                    parent: Some(index),
                    weight,
                    distance: current.distance + edge.distance(),
                    time_ms: current.time_ms + self.options.weighting.time_ms(edge),
                });
                best.insert(key, next);
                let priority = weight + self.heuristic(edge.adj_node(), target)?;
                heap.push(Reverse(Candidate { priority, index: next }));
            }
        }

        Ok(Path::not_found(from, to))
    }

    /// Walks parents back from the target entry
    fn extract(&self, spt: &[SptEntry], target: usize, from: NodeId, to: NodeId) -> Result<Path> {
        let end = spt[target];
        let mut edges = Vec::new();
        let mut nodes = vec![end.node];

        let mut cursor = target;
        while let (Some(edge), Some(parent)) = (spt[cursor].edge, spt[cursor].parent) {
            edges.push(edge);
            nodes.push(spt[parent].node);
            cursor = parent;
        }
        edges.reverse();
        nodes.reverse();

        debug_assert_eq!(nodes.first().copied(), Some(from));
        Ok(Path::found(from, to, edges, nodes, end.distance, end.time_ms, end.weight))
    }
}

impl RoutingAlgorithm for ShortestPath<'_> {
    fn calc_paths(&mut self, from: NodeId, to: NodeId) -> Result<Vec<Path>> {
        Ok(vec![self.calc_path(from, to)?])
    }

    fn visited_nodes(&self) -> usize {
        self.visited
    }

    fn name(&self) -> &str {
        match self.options.algorithm {
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::AStar => "astar",
        }
    }
}
