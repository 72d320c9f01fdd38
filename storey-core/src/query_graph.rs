//! Per-request overlay graph.
//!
//! Lookup results that land inside an edge (or on a pillar) are injected as
//! virtual nodes. The snapped edge is hidden and replaced by a chain of
//! virtual edges `base -> v1 -> ... -> vn -> adj` carrying the original
//! kind, access and geometry slices. Virtual ids continue after the stored
//! ones, so `node < graph.node_count()` identifies a stored node.
//!
//! Virtual edges have no level storage; they expose none through
//! [`EdgeState::level_aware`].

use crate::edge::{EdgeKind, EdgeState};
use crate::error::{Error, Result};
use crate::geo::{GeoPoint, angle_delta, bearing, haversine_distance};
use crate::graph::{ACCESS_BACKWARD, ACCESS_FORWARD, EdgeId, LevelGraph, NodeId};
use crate::location_index::{QueryResult, SnappedPosition};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Maximum deviation (degrees) between a virtual edge and the favored heading
/// before the edge is unfavored
pub const HEADING_TOLERANCE_DEG: f64 = 100.0;

/// An edge synthesized for one request, stored in the snapped edge's orientation
#[derive(Debug, Clone)]
pub struct VirtualEdge {
    id: EdgeId,
    base: NodeId,
    adj: NodeId,
    distance: f64,
    kind: EdgeKind,
    access: u8,
    pillars: Vec<GeoPoint>,
    original: EdgeId,
}

/// Directed view of a [`VirtualEdge`]
#[derive(Debug, Clone, Copy)]
pub struct VirtualEdgeRef<'a> {
    edge: &'a VirtualEdge,
    reversed: bool,
    unfavored: bool,
}

impl VirtualEdgeRef<'_> {
    /// Virtual edge id
    pub fn edge(&self) -> EdgeId {
        self.edge.id
    }

    /// Node this edge starts at, in traversal direction
    pub fn base_node(&self) -> NodeId {
        if self.reversed { self.edge.adj } else { self.edge.base }
    }

    /// Node this edge leads to
    pub fn adj_node(&self) -> NodeId {
        if self.reversed { self.edge.base } else { self.edge.adj }
    }

    /// Length in meters, a share of the split edge's distance
    pub fn distance(&self) -> f64 {
        self.edge.distance
    }

    /// Kind of the split edge
    pub fn kind(&self) -> EdgeKind {
        self.edge.kind
    }

    /// True if traversed against its stored orientation
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Traversable from `base_node` to `adj_node`
    pub fn is_forward(&self) -> bool {
        let bit = if self.reversed { ACCESS_BACKWARD } else { ACCESS_FORWARD };
        self.edge.access & bit != 0
    }

    /// Traversable from `adj_node` to `base_node`
    pub fn is_backward(&self) -> bool {
        let bit = if self.reversed { ACCESS_FORWARD } else { ACCESS_BACKWARD };
        self.edge.access & bit != 0
    }

    /// True if penalized by a heading or pass-through constraint
    pub fn is_unfavored(&self) -> bool {
        self.unfavored
    }

    /// Stored edge this virtual edge was cut from
    pub fn original_edge(&self) -> EdgeId {
        self.edge.original
    }

    /// Interior geometry in traversal direction
    pub fn pillars(&self) -> Vec<GeoPoint> {
        if self.reversed {
            self.edge.pillars.iter().rev().copied().collect()
        } else {
            self.edge.pillars.clone()
        }
    }
}

/// Stored graph plus the virtual nodes and edges of one request
#[derive(Debug)]
pub struct QueryGraph<'g> {
    graph: &'g LevelGraph,
    virtual_nodes: Vec<GeoPoint>,
    virtual_edges: Vec<VirtualEdge>,
    /// Virtual edges at a node as (index into `virtual_edges`, reversed)
    virtual_adjacency: HashMap<NodeId, Vec<(usize, bool)>>,
    /// Stored edges replaced by a virtual chain
    split_edges: HashSet<EdgeId>,
    unfavored: HashSet<EdgeId>,
}

impl<'g> QueryGraph<'g> {
    /// Injects `results` into an overlay of `graph`.
    ///
    /// Every valid non-tower result gets a virtual node and its
    /// `closest_node` is rewritten to it. Several results on one edge are
    /// chained in order along the edge; results at the same spot share a node.
    pub fn new(graph: &'g LevelGraph, results: &mut [QueryResult]) -> Result<Self> {
        let mut query_graph = Self {
            graph,
            virtual_nodes: Vec::new(),
            virtual_edges: Vec::new(),
            virtual_adjacency: HashMap::new(),
            split_edges: HashSet::new(),
            unfavored: HashSet::new(),
        };

        let mut by_edge: BTreeMap<EdgeId, Vec<usize>> = BTreeMap::new();
        for (i, result) in results.iter().enumerate() {
            if result.is_valid() && result.position != SnappedPosition::Tower {
                by_edge.entry(result.closest_edge).or_default().push(i);
            }
        }

        for (edge, mut indices) in by_edge {
            indices.sort_by(|&a, &b| {
                results[a].segment.cmp(&results[b].segment).then(results[a].t.total_cmp(&results[b].t))
            });
            query_graph.split(edge, &indices, results)?;
        }

        Ok(query_graph)
    }

    fn split(&mut self, edge_id: EdgeId, indices: &[usize], results: &mut [QueryResult]) -> Result<()> {
        let edge = self.graph.edge(edge_id, None)?;
        let full = edge.points()?;
        let total_length = polyline_length(&full);
        let scale = if total_length > 0.0 { edge.distance() / total_length } else { 0.0 };

        let mut access = 0;
        if edge.is_forward() {
            access |= ACCESS_FORWARD;
        }
        if edge.is_backward() {
            access |= ACCESS_BACKWARD;
        }
        let template = VirtualEdge {
            id: 0,
            base: 0,
            adj: 0,
            distance: 0.0,
            kind: edge.kind(),
            access,
            pillars: Vec::new(),
            original: edge_id,
        };

        let mut prev_node = edge.base_node();
        let mut prev_point = full[0];
        let mut next_index = 1;
        let mut assigned = 0.0;
        let mut last_snap: Option<(usize, f64, NodeId)> = None;

        for &i in indices {
            let (segment, t, point) = (results[i].segment, results[i].t, results[i].snapped_point);

            if let Some((s, last_t, node)) = last_snap {
                if s == segment && (t - last_t).abs() <= f64::EPSILON {
                    results[i].closest_node = node;
                    continue;
                }
            }

            // A pillar hit (t = 0) turns full[segment] itself into the virtual node
            let end = if t == 0.0 { segment } else { segment + 1 };
            let pillars = if next_index < end { full[next_index..end].to_vec() } else { Vec::new() };
            next_index = next_index.max(segment + 1);

            let node = self.add_virtual_node(point)?;
            let distance = piece_length(prev_point, &pillars, point) * scale;
            assigned += distance;
            self.add_virtual_edge(VirtualEdge {
                base: prev_node,
                adj: node,
                distance,
                pillars,
                ..template.clone()
            })?;

            results[i].closest_node = node;
            last_snap = Some((segment, t, node));
            prev_node = node;
            prev_point = point;
        }

        let last = full.len() - 1;
        let pillars = if next_index < last { full[next_index..last].to_vec() } else { Vec::new() };
        self.add_virtual_edge(VirtualEdge {
            base: prev_node,
            adj: edge.adj_node(),
            distance: (edge.distance() - assigned).max(0.0),
            pillars,
            ..template
        })?;

        self.split_edges.insert(edge_id);
        Ok(())
    }

    fn add_virtual_node(&mut self, point: GeoPoint) -> Result<NodeId> {
        let id = u32::try_from(self.virtual_nodes.len())
            .ok()
            .and_then(|n| self.graph.node_count().checked_add(n))
            .ok_or_else(|| Error::InvalidArgument("virtual node id space exhausted".to_string()))?;
        self.virtual_nodes.push(point);
        Ok(id)
    }

    fn add_virtual_edge(&mut self, mut edge: VirtualEdge) -> Result<()> {
        let index = self.virtual_edges.len();
        edge.id = u32::try_from(index)
            .ok()
            .and_then(|n| self.graph.edge_count().checked_add(n))
            .ok_or_else(|| Error::InvalidArgument("virtual edge id space exhausted".to_string()))?;

        self.virtual_adjacency.entry(edge.base).or_default().push((index, false));
        self.virtual_adjacency.entry(edge.adj).or_default().push((index, true));
        self.virtual_edges.push(edge);
        Ok(())
    }

    /// Stored graph under this overlay
    pub fn base_graph(&self) -> &'g LevelGraph {
        self.graph
    }

    /// Stored plus virtual nodes
    pub fn node_count(&self) -> u32 {
        self.graph.node_count() + self.virtual_nodes.len() as u32
    }

    /// Stored plus virtual edges (split edges included)
    pub fn edge_count(&self) -> u32 {
        self.graph.edge_count() + self.virtual_edges.len() as u32
    }

    /// True for a node injected by this overlay
    pub fn is_virtual_node(&self, node: NodeId) -> bool {
        node >= self.graph.node_count() && node < self.node_count()
    }

    /// True for an edge injected by this overlay
    pub fn is_virtual_edge(&self, edge: EdgeId) -> bool {
        edge >= self.graph.edge_count() && edge < self.edge_count()
    }

    /// Number of injected nodes
    pub fn virtual_node_count(&self) -> usize {
        self.virtual_nodes.len()
    }

    /// Coordinates of a stored or virtual node
    pub fn node_point(&self, node: NodeId) -> Result<GeoPoint> {
        if node < self.graph.node_count() {
            return self.graph.node_point(node);
        }
        self.virtual_nodes
            .get((node - self.graph.node_count()) as usize)
            .copied()
            .ok_or(Error::NodeOutOfBounds { node, count: self.node_count() })
    }

    fn virtual_ref(&self, index: usize, reversed: bool) -> VirtualEdgeRef<'_> {
        let edge = &self.virtual_edges[index];
        VirtualEdgeRef { edge, reversed, unfavored: self.unfavored.contains(&edge.id) }
    }

    /// Collects the edges at `node` into `out`, each oriented away from it
    pub fn edges_at<'s>(&'s self, node: NodeId, out: &mut Vec<EdgeState<'s>>) -> Result<()> {
        out.clear();

        if node < self.graph.node_count() {
            for edge in self.graph.edges_at(node)? {
                let edge = edge?;
                if !self.split_edges.contains(&edge.edge()) {
                    out.push(EdgeState::Stored(edge));
                }
            }
        } else if node >= self.node_count() {
            return Err(Error::NodeOutOfBounds { node, count: self.node_count() });
        }

        if let Some(list) = self.virtual_adjacency.get(&node) {
            out.extend(list.iter().map(|&(index, reversed)| EdgeState::Virtual(self.virtual_ref(index, reversed))));
        }
        Ok(())
    }

    /// Edge `edge` oriented towards `adj`
    pub fn edge_state(&self, edge: EdgeId, adj: NodeId) -> Result<EdgeState<'_>> {
        if edge < self.graph.edge_count() {
            return Ok(EdgeState::Stored(self.graph.edge(edge, Some(adj))?));
        }

        let index = (edge - self.graph.edge_count()) as usize;
        let virtual_edge = self
            .virtual_edges
            .get(index)
            .ok_or(Error::EdgeOutOfBounds { edge, count: self.edge_count() })?;

        if adj == virtual_edge.adj {
            Ok(EdgeState::Virtual(self.virtual_ref(index, false)))
        } else if adj == virtual_edge.base {
            Ok(EdgeState::Virtual(self.virtual_ref(index, true)))
        } else {
            Err(Error::NotAdjacent { edge, node: adj })
        }
    }

    /// Unfavors the virtual edges at a virtual node that deviate more than
    /// [`HEADING_TOLERANCE_DEG`] from `heading`.
    ///
    /// With `incoming` the heading describes arrival at the node. Returns
    /// true if any edge was unfavored. NaN headings and stored nodes are ignored.
    pub fn enforce_heading(&mut self, node: NodeId, heading: f64, incoming: bool) -> Result<bool> {
        if heading.is_nan() || !self.is_virtual_node(node) {
            return Ok(false);
        }
        let Some(list) = self.virtual_adjacency.get(&node) else {
            return Ok(false);
        };

        let origin = self.node_point(node)?;
        let mut deviating = Vec::new();
        for &(index, reversed) in list {
            let edge = self.virtual_ref(index, reversed);
            let next = match edge.pillars().first() {
                Some(&p) => p,
                None => self.node_point(edge.adj_node())?,
            };
            let orientation = if incoming { bearing(next, origin) } else { bearing(origin, next) };
            if angle_delta(orientation, heading) > HEADING_TOLERANCE_DEG {
                deviating.push(edge.edge());
            }
        }

        let enforced = !deviating.is_empty();
        self.unfavored.extend(deviating);
        Ok(enforced)
    }

    /// Unfavors a virtual edge at a virtual node; returns false otherwise
    pub fn unfavor_edge(&mut self, node: NodeId, edge: EdgeId) -> bool {
        if !self.is_virtual_node(node) || !self.is_virtual_edge(edge) {
            return false;
        }
        self.unfavored.insert(edge);
        true
    }

    /// Virtual edges currently penalized
    pub fn unfavored_edges(&self) -> &HashSet<EdgeId> {
        &self.unfavored
    }

    /// Drops every heading or pass-through penalty
    pub fn clear_unfavored_status(&mut self) {
        self.unfavored.clear();
    }
}

fn polyline_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_distance(w[0], w[1])).sum()
}

fn piece_length(from: GeoPoint, pillars: &[GeoPoint], to: GeoPoint) -> f64 {
    let mut length = 0.0;
    let mut prev = from;
    for &p in pillars.iter().chain(std::iter::once(&to)) {
        length += haversine_distance(prev, p);
        prev = p;
    }
    length
}
