//! Edge handles, cursors and the level capability.
//!
//! Every accessor of [`LevelGraph`] that hands out an edge (single edge by id,
//! all edges, edges at a node) returns a handle implementing [`LevelAware`];
//! mutable handles also implement [`LevelAwareMut`]. Query-graph edges come
//! through [`EdgeState`], whose [`level_aware`](EdgeState::level_aware)
//! returns `None` for virtual edges instead of failing a downcast.

use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::graph::{ACCESS_BACKWARD, ACCESS_FORWARD, EdgeId, EdgeRecord, LevelGraph, NO_EDGE, NodeId};
use crate::level::EdgeLevel;
use crate::query_graph::VirtualEdgeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical kind of an indoor edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EdgeKind {
    /// Walkable floor surface
    #[default]
    Footway = 0,
    /// Staircase
    Stairs = 1,
    /// Lift shaft link
    Elevator = 2,
}

impl EdgeKind {
    /// Decodes a stored kind tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Footway),
            1 => Some(Self::Stairs),
            2 => Some(Self::Elevator),
            _ => None,
        }
    }
}

/// Read side of the level capability
pub trait LevelAware {
    /// Level of this edge as seen from its base node
    fn level(&self) -> Result<EdgeLevel<'_>>;
}

/// Write side of the level capability
pub trait LevelAwareMut: LevelAware {
    /// Assigns `label` to this edge.
    ///
    /// Endpoint nodes are always tagged, so a later read through any handle
    /// (either direction, any accessor) observes the assignment.
    fn set_level(&mut self, label: &str) -> Result<()>;
}

/// Read-only handle to a stored edge, oriented from `base_node` to `adj_node`
#[derive(Clone, Copy)]
pub struct EdgeRef<'g> {
    graph: &'g LevelGraph,
    edge: EdgeId,
    base: NodeId,
    adj: NodeId,
    record: EdgeRecord,
}

impl<'g> EdgeRef<'g> {
    pub(crate) fn new(
        graph: &'g LevelGraph,
        edge: EdgeId,
        base: NodeId,
        adj: NodeId,
        record: EdgeRecord,
    ) -> Self {
        Self { graph, edge, base, adj, record }
    }

    /// Edge id
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    /// Node this handle starts at
    pub fn base_node(&self) -> NodeId {
        self.base
    }

    /// Node this handle points to
    pub fn adj_node(&self) -> NodeId {
        self.adj
    }

    /// Length in meters
    pub fn distance(&self) -> f64 {
        self.record.distance
    }

    /// Physical kind (footway, stairs, elevator)
    pub fn kind(&self) -> EdgeKind {
        self.record.kind
    }

    /// True if this handle runs against stored orientation
    pub fn is_reversed(&self) -> bool {
        self.record.base != self.base
    }

    /// Traversable from `base_node` to `adj_node`
    pub fn is_forward(&self) -> bool {
        let bit = if self.is_reversed() { ACCESS_BACKWARD } else { ACCESS_FORWARD };
        self.record.access & bit != 0
    }

    /// Traversable from `adj_node` to `base_node`
    pub fn is_backward(&self) -> bool {
        let bit = if self.is_reversed() { ACCESS_FORWARD } else { ACCESS_BACKWARD };
        self.record.access & bit != 0
    }

    /// Interior geometry points in handle direction
    pub fn pillars(&self) -> Result<Vec<GeoPoint>> {
        let mut pillars = self.graph.read_pillars(&self.record)?;
        if self.is_reversed() {
            pillars.reverse();
        }
        Ok(pillars)
    }

    /// Full geometry: base tower, pillars, adj tower
    pub fn points(&self) -> Result<Vec<GeoPoint>> {
        let pillars = self.pillars()?;
        let mut points = Vec::with_capacity(pillars.len() + 2);
        points.push(self.graph.node_point(self.base)?);
        points.extend(pillars);
        points.push(self.graph.node_point(self.adj)?);
        Ok(points)
    }

    /// The same edge seen from `adj_node`
    pub fn detach(&self) -> Self {
        Self { base: self.adj, adj: self.base, ..*self }
    }
}

impl LevelAware for EdgeRef<'_> {
    fn level(&self) -> Result<EdgeLevel<'_>> {
        self.graph.edge_level(&self.record, self.base, self.adj)
    }
}

impl fmt::Debug for EdgeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeRef")
            .field("edge", &self.edge)
            .field("base", &self.base)
            .field("adj", &self.adj)
            .field("distance", &self.record.distance)
            .field("kind", &self.record.kind)
            .finish()
    }
}

/// Mutable handle to a stored edge
pub struct EdgeMut<'g> {
    graph: &'g mut LevelGraph,
    edge: EdgeId,
    base: NodeId,
    adj: NodeId,
}

impl<'g> EdgeMut<'g> {
    pub(crate) fn new(graph: &'g mut LevelGraph, edge: EdgeId, base: NodeId, adj: NodeId) -> Self {
        Self { graph, edge, base, adj }
    }

    /// Edge id
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    /// Node this handle starts at
    pub fn base_node(&self) -> NodeId {
        self.base
    }

    /// Node this handle points to
    pub fn adj_node(&self) -> NodeId {
        self.adj
    }

    /// Read-only view of the current record
    pub fn view(&self) -> Result<EdgeRef<'_>> {
        self.graph.edge(self.edge, Some(self.adj))
    }

    /// Stores the physical kind of the edge
    pub fn set_kind(&mut self, kind: EdgeKind) -> Result<()> {
        self.graph.set_edge_kind(self.edge, kind)
    }

    /// Sets one-way restrictions relative to this handle's direction
    pub fn set_access(&mut self, forward: bool, backward: bool) -> Result<()> {
        let reversed = self.graph.read_edge(self.edge)?.base != self.base;
        let (stored_fwd, stored_bwd) = if reversed { (backward, forward) } else { (forward, backward) };

        let mut access = 0;
        if stored_fwd {
            access |= ACCESS_FORWARD;
        }
        if stored_bwd {
            access |= ACCESS_BACKWARD;
        }
        self.graph.set_edge_access(self.edge, access)
    }

    /// Stores interior geometry given in this handle's direction
    pub fn set_geometry(&mut self, pillars: &[GeoPoint]) -> Result<()> {
        let reversed = self.graph.read_edge(self.edge)?.base != self.base;
        if reversed {
            let stored: Vec<GeoPoint> = pillars.iter().rev().copied().collect();
            self.graph.store_pillars(self.edge, &stored)
        } else {
            self.graph.store_pillars(self.edge, pillars)
        }
    }
}

impl LevelAware for EdgeMut<'_> {
    fn level(&self) -> Result<EdgeLevel<'_>> {
        let record = self.graph.read_edge(self.edge)?;
        self.graph.edge_level(&record, self.base, self.adj)
    }
}

impl LevelAwareMut for EdgeMut<'_> {
    fn set_level(&mut self, label: &str) -> Result<()> {
        self.graph.assign_edge_level(self.edge, self.base, self.adj, label)
    }
}

impl fmt::Debug for EdgeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeMut")
            .field("edge", &self.edge)
            .field("base", &self.base)
            .field("adj", &self.adj)
            .finish()
    }
}

/// Iterator over every stored edge in id order
pub struct AllEdgesIter<'g> {
    graph: &'g LevelGraph,
    next: EdgeId,
}

impl<'g> AllEdgesIter<'g> {
    pub(crate) fn new(graph: &'g LevelGraph) -> Self {
        Self { graph, next: 0 }
    }
}

impl<'g> Iterator for AllEdgesIter<'g> {
    type Item = Result<EdgeRef<'g>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.graph.edge_count() {
            return None;
        }
        let edge = self.next;
        self.next += 1;
        Some(self.graph.edge(edge, None))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.graph.edge_count() - self.next) as usize;
        (remaining, Some(remaining))
    }
}

/// Walks one adjacency list, guarding against corrupted (cyclic) links
struct AdjacencyWalk {
    node: NodeId,
    next: i32,
    remaining: u32,
}

impl AdjacencyWalk {
    fn new(node: NodeId, first: i32, edge_count: u32) -> Self {
        Self { node, next: first, remaining: edge_count }
    }

    /// Reads the next `(edge, record)` and advances
    fn step(&mut self, graph: &LevelGraph) -> Option<Result<(EdgeId, EdgeRecord)>> {
        if self.next == NO_EDGE {
            return None;
        }
        if self.next < 0 || self.remaining == 0 {
            self.next = NO_EDGE;
            return Some(Err(Error::Corrupt(format!(
                "adjacency list of node {} is cyclic or has a bad link",
                self.node
            ))));
        }

        let edge = self.next as EdgeId;
        self.remaining -= 1;
        match graph.read_edge(edge) {
            Ok(record) if record.base == self.node || record.adj == self.node => {
                self.next = record.link_for(self.node);
                Some(Ok((edge, record)))
            }
            Ok(_) => {
                self.next = NO_EDGE;
                Some(Err(Error::NotAdjacent { edge, node: self.node }))
            }
            Err(e) => {
                self.next = NO_EDGE;
                Some(Err(e))
            }
        }
    }

    fn other(&self, record: &EdgeRecord) -> NodeId {
        if record.base == self.node { record.adj } else { record.base }
    }
}

/// Iterator over the edges at a node, each oriented away from it
pub struct EdgesAtIter<'g> {
    graph: &'g LevelGraph,
    walk: AdjacencyWalk,
}

impl<'g> EdgesAtIter<'g> {
    pub(crate) fn new(graph: &'g LevelGraph, node: NodeId, first: i32) -> Self {
        Self { graph, walk: AdjacencyWalk::new(node, first, graph.edge_count()) }
    }
}

impl<'g> Iterator for EdgesAtIter<'g> {
    type Item = Result<EdgeRef<'g>>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        let node = self.walk.node;
        Some(self.walk.step(graph)?.map(|(edge, record)| {
            let adj = self.walk.other(&record);
            EdgeRef::new(graph, edge, node, adj, record)
        }))
    }
}

/// Lending cursor over every edge, yielding mutable handles
pub struct AllEdgesMut<'g> {
    graph: &'g mut LevelGraph,
    next: EdgeId,
}

impl<'g> AllEdgesMut<'g> {
    pub(crate) fn new(graph: &'g mut LevelGraph) -> Self {
        Self { graph, next: 0 }
    }

    /// Advances to the next edge (stored orientation)
    pub fn next_edge(&mut self) -> Option<Result<EdgeMut<'_>>> {
        if self.next >= self.graph.edge_count() {
            return None;
        }
        let edge = self.next;
        self.next += 1;
        Some(self.graph.edge_mut(edge, None))
    }
}

/// Lending cursor over the edges at a node, yielding mutable handles
pub struct EdgesAtMut<'g> {
    graph: &'g mut LevelGraph,
    walk: AdjacencyWalk,
}

impl<'g> EdgesAtMut<'g> {
    pub(crate) fn new(graph: &'g mut LevelGraph, node: NodeId, first: i32) -> Self {
        let edge_count = graph.edge_count();
        Self { graph, walk: AdjacencyWalk::new(node, first, edge_count) }
    }

    /// Advances to the next edge, oriented away from the node
    pub fn next_edge(&mut self) -> Option<Result<EdgeMut<'_>>> {
        let node = self.walk.node;
        match self.walk.step(self.graph)? {
            Ok((edge, record)) => {
                let adj = self.walk.other(&record);
                Some(Ok(EdgeMut::new(self.graph, edge, node, adj)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// An edge as seen by filters and search: stored or injected for one request
#[derive(Debug, Clone, Copy)]
pub enum EdgeState<'a> {
    /// Edge in the base graph
    Stored(EdgeRef<'a>),
    /// Half of a split edge at a snapped waypoint
    Virtual(VirtualEdgeRef<'a>),
}

impl<'a> EdgeState<'a> {
    /// Edge id; virtual ids follow the stored ones
    pub fn edge(&self) -> EdgeId {
        match self {
            Self::Stored(e) => e.edge(),
            Self::Virtual(v) => v.edge(),
        }
    }

    /// Node this edge starts at, in traversal direction
    pub fn base_node(&self) -> NodeId {
        match self {
            Self::Stored(e) => e.base_node(),
            Self::Virtual(v) => v.base_node(),
        }
    }

    /// Node this edge leads to
    pub fn adj_node(&self) -> NodeId {
        match self {
            Self::Stored(e) => e.adj_node(),
            Self::Virtual(v) => v.adj_node(),
        }
    }

    /// Length in meters
    pub fn distance(&self) -> f64 {
        match self {
            Self::Stored(e) => e.distance(),
            Self::Virtual(v) => v.distance(),
        }
    }

    /// Physical kind, inherited from the split edge for virtual edges
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Stored(e) => e.kind(),
            Self::Virtual(v) => v.kind(),
        }
    }

    /// Traversable from `base_node` to `adj_node`
    pub fn is_forward(&self) -> bool {
        match self {
            Self::Stored(e) => e.is_forward(),
            Self::Virtual(v) => v.is_forward(),
        }
    }

    /// Traversable from `adj_node` to `base_node`
    pub fn is_backward(&self) -> bool {
        match self {
            Self::Stored(e) => e.is_backward(),
            Self::Virtual(v) => v.is_backward(),
        }
    }

    /// True for an edge synthesized by the query graph
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    /// True if heading enforcement penalized this edge for the current leg
    pub fn is_unfavored(&self) -> bool {
        match self {
            Self::Stored(_) => false,
            Self::Virtual(v) => v.is_unfavored(),
        }
    }

    /// Interior geometry in traversal direction
    pub fn pillars(&self) -> Result<Vec<GeoPoint>> {
        match self {
            Self::Stored(e) => e.pillars(),
            Self::Virtual(v) => Ok(v.pillars()),
        }
    }

    /// Level capability, absent for virtual edges
    pub fn level_aware(&self) -> Option<&dyn LevelAware> {
        match self {
            Self::Stored(e) => Some(e),
            Self::Virtual(_) => None,
        }
    }
}

impl<'a> From<EdgeRef<'a>> for EdgeState<'a> {
    fn from(edge: EdgeRef<'a>) -> Self {
        Self::Stored(edge)
    }
}
