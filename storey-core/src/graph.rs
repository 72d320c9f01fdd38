//! Level-augmented graph store.
//!
//! A graph lives in a directory holding four regions:
//!
//! ```text
//! nodes      slot 0 = node count, slot 1 = level strategy
//!            [lat f64][lon f64][first_edge i32][level i32]            24 bytes
//! edges      slot 0 = edge count
//!            [base u32][adj u32][link_base i32][link_adj i32]
//!            [distance f64][geometry u64][level_ref u32]
//!            [kind u8][access u8][pad 2]                               40 bytes
//! geometry   slots 0/1 = cursor
//!            [count u32][lat f64, lon f64] * count
//! levels     see `dictionary`
//! ```
//!
//! Node and edge records are fixed-width, so `offset = id * RECORD_SIZE`.
//! Edges at a node form a singly linked list through `first_edge` and the
//! `link_base`/`link_adj` fields, which makes insertion O(1).

use crate::dictionary::{LevelDictionary, LevelRef};
use crate::edge::{AllEdgesIter, AllEdgesMut, EdgeKind, EdgeMut, EdgeRef, EdgesAtIter, EdgesAtMut};
use crate::error::{Error, Result};
use crate::geo::{BBox, GeoPoint};
use crate::header::RegionKind;
use crate::level::{EdgeLevel, LEVEL_SEPARATOR, Level};
use crate::storage::{
    Region, combine_cursor, read_f64, read_i32, read_u32, read_u64, split_cursor,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Node identifier (index into the node region)
pub type NodeId = u32;

/// Edge identifier (index into the edge region)
pub type EdgeId = u32;

/// Sentinel for "no edge" in adjacency links
pub const NO_EDGE: i32 = -1;

/// Sentinel for an untagged node level
pub const NO_LEVEL: i32 = i32::MIN;

/// Node record size in bytes
pub const NODE_RECORD_SIZE: usize = 24;

/// Edge record size in bytes
pub const EDGE_RECORD_SIZE: usize = 40;

/// Access bit: traversable from stored base to stored adj
pub(crate) const ACCESS_FORWARD: u8 = 0b01;

/// Access bit: traversable from stored adj to stored base
pub(crate) const ACCESS_BACKWARD: u8 = 0b10;

const GEOMETRY_START: u64 = 1;

const SLOT_COUNT: usize = 0;
const SLOT_STRATEGY: usize = 1;
const SLOT_GEOMETRY_LOW: usize = 0;
const SLOT_GEOMETRY_HIGH: usize = 1;

/// How an edge's level is represented.
///
/// Fixed when a graph directory is created and persisted with it; a graph
/// never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum LevelStrategy {
    /// Each edge stores a dictionary reference; endpoint nodes are tagged too
    PerEdge = 1,
    /// Edge level is computed from the two endpoint node levels on read
    #[default]
    NodeDerived = 2,
}

impl LevelStrategy {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::PerEdge),
            2 => Some(Self::NodeDerived),
            _ => None,
        }
    }
}

/// Options applied when a graph directory is opened or created
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Edge level representation (checked against the stored one on reopen)
    pub strategy: LevelStrategy,
}

/// Fixed-width node record
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NodeRecord {
    pub lat: f64,
    pub lon: f64,
    pub first_edge: i32,
    pub level: i32,
}

impl NodeRecord {
    fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, first_edge: NO_EDGE, level: NO_LEVEL }
    }

    fn to_bytes(self) -> [u8; NODE_RECORD_SIZE] {
        let mut buf = [0u8; NODE_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.lat.to_le_bytes());
        buf[8..16].copy_from_slice(&self.lon.to_le_bytes());
        buf[16..20].copy_from_slice(&self.first_edge.to_le_bytes());
        buf[20..24].copy_from_slice(&self.level.to_le_bytes());
        buf
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            lat: read_f64(bytes, 0),
            lon: read_f64(bytes, 8),
            first_edge: read_i32(bytes, 16),
            level: read_i32(bytes, 20),
        }
    }
}

/// Fixed-width edge record, always in stored orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeRecord {
    pub base: NodeId,
    pub adj: NodeId,
    pub link_base: i32,
    pub link_adj: i32,
    pub distance: f64,
    pub geometry: u64,
    pub level_ref: u32,
    pub kind: EdgeKind,
    pub access: u8,
}

impl EdgeRecord {
    fn to_bytes(self) -> [u8; EDGE_RECORD_SIZE] {
        let mut buf = [0u8; EDGE_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.base.to_le_bytes());
        buf[4..8].copy_from_slice(&self.adj.to_le_bytes());
        buf[8..12].copy_from_slice(&self.link_base.to_le_bytes());
        buf[12..16].copy_from_slice(&self.link_adj.to_le_bytes());
        buf[16..24].copy_from_slice(&self.distance.to_le_bytes());
        buf[24..32].copy_from_slice(&self.geometry.to_le_bytes());
        buf[32..36].copy_from_slice(&self.level_ref.to_le_bytes());
        buf[36] = self.kind as u8;
        buf[37] = self.access;
        buf
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let kind = EdgeKind::from_u8(bytes[36])
            .ok_or_else(|| Error::Corrupt(format!("unknown edge kind tag {}", bytes[36])))?;
        Ok(Self {
            base: read_u32(bytes, 0),
            adj: read_u32(bytes, 4),
            link_base: read_i32(bytes, 8),
            link_adj: read_i32(bytes, 12),
            distance: read_f64(bytes, 16),
            geometry: read_u64(bytes, 24),
            level_ref: read_u32(bytes, 32),
            kind,
            access: bytes[37],
        })
    }

    /// Next edge in the adjacency list of `node`
    pub(crate) fn link_for(&self, node: NodeId) -> i32 {
        if self.base == node { self.link_base } else { self.link_adj }
    }
}

/// Persistent graph whose nodes carry a level and whose edges expose one.
#[derive(Debug)]
pub struct LevelGraph {
    dir: PathBuf,
    nodes: Region,
    edges: Region,
    geometry: Region,
    levels: LevelDictionary,
    strategy: LevelStrategy,
    node_count: u32,
    edge_count: u32,
    geometry_cursor: u64,
    frozen: bool,
    bounds: BBox,
    known_levels: Arc<HashSet<Level>>,
}

impl LevelGraph {
    /// Opens the graph stored in `dir`, creating the directory and regions if needed
    ///
    /// # Errors
    ///
    /// - `StrategyMismatch` if the directory was created with another strategy
    /// - `Corrupt` if persisted counts or cursors exceed the mapped data
    /// - `Storage`/`Io` if a region cannot be opened or locked
    pub fn open<P: AsRef<Path>>(dir: P, options: GraphOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut nodes = Region::open(dir.join(RegionKind::Nodes.file_name()), RegionKind::Nodes)?;
        let edges = Region::open(dir.join(RegionKind::Edges.file_name()), RegionKind::Edges)?;
        let geometry =
            Region::open(dir.join(RegionKind::Geometry.file_name()), RegionKind::Geometry)?;
        let levels = LevelDictionary::open(dir.join(RegionKind::Levels.file_name()))?;

        let strategy = match nodes.header_slot(SLOT_STRATEGY) {
            0 => {
                nodes.set_header_slot(SLOT_STRATEGY, options.strategy as u32);
                options.strategy
            }
            tag => {
                let stored = LevelStrategy::from_u32(tag)
                    .ok_or_else(|| Error::Corrupt(format!("unknown level strategy tag {tag}")))?;
                if stored != options.strategy {
                    return Err(Error::StrategyMismatch { stored, requested: options.strategy });
                }
                stored
            }
        };

        let node_count = nodes.header_slot(SLOT_COUNT);
        if node_count as usize * NODE_RECORD_SIZE > nodes.capacity() {
            return Err(Error::Corrupt(format!("node count {node_count} exceeds node region")));
        }

        let edge_count = edges.header_slot(SLOT_COUNT);
        if edge_count as usize * EDGE_RECORD_SIZE > edges.capacity() {
            return Err(Error::Corrupt(format!("edge count {edge_count} exceeds edge region")));
        }

        let geometry_cursor = combine_cursor(
            geometry.header_slot(SLOT_GEOMETRY_LOW),
            geometry.header_slot(SLOT_GEOMETRY_HIGH),
        )
        .max(GEOMETRY_START);
        if geometry_cursor > GEOMETRY_START && geometry_cursor as usize > geometry.capacity() {
            return Err(Error::Corrupt(format!(
                "geometry cursor {geometry_cursor} exceeds geometry region"
            )));
        }

        let mut graph = Self {
            dir,
            nodes,
            edges,
            geometry,
            levels,
            strategy,
            node_count,
            edge_count,
            geometry_cursor,
            frozen: false,
            bounds: BBox::empty(),
            known_levels: Arc::new(HashSet::new()),
        };
        graph.rebuild_node_summaries()?;

        tracing::info!(
            path = %graph.dir.display(),
            nodes = graph.node_count,
            edges = graph.edge_count,
            strategy = ?graph.strategy,
            "Opened level graph"
        );

        Ok(graph)
    }

    /// Recomputes bounds and the known level set from the node region
    fn rebuild_node_summaries(&mut self) -> Result<()> {
        let mut bounds = BBox::empty();
        let mut known = HashSet::new();

        for node in 0..self.node_count {
            let record = self.read_node(node)?;
            bounds.extend(record.lat, record.lon);
            if record.level != NO_LEVEL {
                let label = self.levels.get(LevelRef::from(record.level))?;
                if !label.is_empty() && !label.contains(LEVEL_SEPARATOR) {
                    known.insert(Level::new(label));
                }
            }
        }

        self.bounds = bounds;
        self.known_levels = Arc::new(known);
        Ok(())
    }

    /// Directory holding the graph's regions
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Level strategy of this graph
    pub fn strategy(&self) -> LevelStrategy {
        self.strategy
    }

    /// Number of stored nodes
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Number of stored edges
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Bounding box of all nodes
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    /// Single (non-transition, non-empty) labels assigned to any node
    pub fn known_levels(&self) -> &Arc<HashSet<Level>> {
        &self.known_levels
    }

    /// Read access to the level dictionary
    pub fn levels(&self) -> &LevelDictionary {
        &self.levels
    }

    /// Marks the graph read-only for search. Further node or edge creation fails.
    pub fn freeze(&mut self) {
        if !self.frozen {
            tracing::debug!(nodes = self.node_count, edges = self.edge_count, "Froze level graph");
        }
        self.frozen = true;
    }

    /// True once [`freeze`](Self::freeze) was called
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Appends a node without a level
    ///
    /// # Errors
    ///
    /// `FrozenGraph` once the graph is frozen, `InvalidArgument` for
    /// non-finite coordinates.
    pub fn add_node(&mut self, lat: f64, lon: f64) -> Result<NodeId> {
        if self.frozen {
            return Err(Error::FrozenGraph("nodes"));
        }
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::InvalidArgument(format!("node coordinates ({lat},{lon}) must be finite")));
        }
        if self.node_count == u32::MAX {
            return Err(Error::InvalidArgument("node id space exhausted".to_string()));
        }

        let id = self.node_count;
        self.write_node(id, NodeRecord::new(lat, lon))?;
        self.node_count += 1;
        self.bounds.extend(lat, lon);
        Ok(id)
    }

    /// Coordinates of a node
    pub fn node_point(&self, node: NodeId) -> Result<GeoPoint> {
        let record = self.read_node(node)?;
        Ok(GeoPoint::new(record.lat, record.lon))
    }

    /// Level label of a node ("" if untagged)
    pub fn node_level(&self, node: NodeId) -> Result<&str> {
        let record = self.read_node(node)?;
        if record.level == NO_LEVEL {
            return Ok("");
        }
        self.levels.get(LevelRef::from(record.level))
    }

    /// Raw level field of a node ([`NO_LEVEL`] if untagged)
    pub fn node_level_ref(&self, node: NodeId) -> Result<i32> {
        Ok(self.read_node(node)?.level)
    }

    /// Tags a node with a level label
    ///
    /// Overwriting a different existing label is allowed and logged.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a transition label: a node sits on one level.
    pub fn set_node_level(&mut self, node: NodeId, label: &str) -> Result<()> {
        if label.contains(LEVEL_SEPARATOR) {
            return Err(Error::InvalidArgument(format!("node level {label:?} joins several levels")));
        }
        let mut record = self.read_node(node)?;

        if record.level != NO_LEVEL && tracing::enabled!(tracing::Level::DEBUG) {
            let previous = self.levels.get(LevelRef::from(record.level))?;
            if previous != label {
                tracing::debug!(node, previous, label, "Node level overwritten");
            }
        }

        let reference = self.levels.put(label)?;
        record.level =
            i32::try_from(reference).map_err(|_| Error::ReferenceOverflow(reference as u64, "node"))?;
        self.write_node(node, record)?;

        if !label.is_empty() && !self.known_levels.contains(label) {
            Arc::make_mut(&mut self.known_levels).insert(Level::new(label));
        }
        Ok(())
    }

    /// Creates an edge between two existing nodes and returns a handle in
    /// `a -> b` orientation. Access defaults to both directions.
    ///
    /// # Errors
    ///
    /// `FrozenGraph` once the graph is frozen; `NodeOutOfBounds` for unknown
    /// nodes; `InvalidArgument` for loops or a negative/non-finite distance.
    pub fn create_edge(&mut self, a: NodeId, b: NodeId, distance: f64) -> Result<EdgeMut<'_>> {
        if self.frozen {
            return Err(Error::FrozenGraph("edges"));
        }
        if a == b {
            return Err(Error::InvalidArgument(format!("loop edge at node {a} is not supported")));
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::InvalidArgument(format!("edge distance {distance} must be finite and >= 0")));
        }
        if self.edge_count >= i32::MAX as u32 {
            return Err(Error::InvalidArgument("edge id space exhausted".to_string()));
        }

        let mut base_node = self.read_node(a)?;
        let mut adj_node = self.read_node(b)?;

        let id = self.edge_count;
        let record = EdgeRecord {
            base: a,
            adj: b,
            link_base: base_node.first_edge,
            link_adj: adj_node.first_edge,
            distance,
            geometry: 0,
            level_ref: 0,
            kind: EdgeKind::Footway,
            access: ACCESS_FORWARD | ACCESS_BACKWARD,
        };
        self.write_edge(id, record)?;
        self.edge_count += 1;

        base_node.first_edge = id as i32;
        adj_node.first_edge = id as i32;
        self.write_node(a, base_node)?;
        self.write_node(b, adj_node)?;

        Ok(EdgeMut::new(self, id, a, b))
    }

    /// Single edge by id. With `adj = Some(n)` the handle points towards `n`,
    /// otherwise it uses stored orientation.
    ///
    /// # Errors
    ///
    /// `EdgeOutOfBounds` for unknown ids, `NotAdjacent` if `n` is not an endpoint.
    pub fn edge(&self, edge: EdgeId, adj: Option<NodeId>) -> Result<EdgeRef<'_>> {
        let record = self.read_edge(edge)?;
        let (base, adj) = Self::orient(&record, edge, adj)?;
        Ok(EdgeRef::new(self, edge, base, adj, record))
    }

    /// Mutable handle to a single edge, oriented as in [`edge`](Self::edge)
    pub fn edge_mut(&mut self, edge: EdgeId, adj: Option<NodeId>) -> Result<EdgeMut<'_>> {
        let record = self.read_edge(edge)?;
        let (base, adj) = Self::orient(&record, edge, adj)?;
        Ok(EdgeMut::new(self, edge, base, adj))
    }

    fn orient(record: &EdgeRecord, edge: EdgeId, adj: Option<NodeId>) -> Result<(NodeId, NodeId)> {
        match adj {
            None => Ok((record.base, record.adj)),
            Some(n) if n == record.adj => Ok((record.base, record.adj)),
            Some(n) if n == record.base => Ok((record.adj, record.base)),
            Some(node) => Err(Error::NotAdjacent { edge, node }),
        }
    }

    /// Iterates every edge once, in id order and stored orientation
    pub fn all_edges(&self) -> AllEdgesIter<'_> {
        AllEdgesIter::new(self)
    }

    /// Iterates the edges at `node`, each oriented away from it
    pub fn edges_at(&self, node: NodeId) -> Result<EdgesAtIter<'_>> {
        let first = self.read_node(node)?.first_edge;
        Ok(EdgesAtIter::new(self, node, first))
    }

    /// Lending cursor over every edge with mutable handles
    pub fn all_edges_mut(&mut self) -> AllEdgesMut<'_> {
        AllEdgesMut::new(self)
    }

    /// Lending cursor over the edges at `node` with mutable handles
    pub fn edges_at_mut(&mut self, node: NodeId) -> Result<EdgesAtMut<'_>> {
        let first = self.read_node(node)?.first_edge;
        Ok(EdgesAtMut::new(self, node, first))
    }

    /// Persists counts and cursors and commits every region
    pub fn flush(&mut self) -> Result<()> {
        self.nodes.set_header_slot(SLOT_COUNT, self.node_count);
        self.edges.set_header_slot(SLOT_COUNT, self.edge_count);
        let (low, high) = split_cursor(self.geometry_cursor);
        self.geometry.set_header_slot(SLOT_GEOMETRY_LOW, low);
        self.geometry.set_header_slot(SLOT_GEOMETRY_HIGH, high);

        self.nodes.commit()?;
        self.edges.commit()?;
        self.geometry.commit()?;
        self.levels.flush()?;
        Ok(())
    }

    // Level assignment and lookup used by the edge handles

    /// Tags the endpoints of `(base -> adj)` with `label` and, under
    /// [`LevelStrategy::PerEdge`], stores the label on the edge as well.
    ///
    /// For a transition label `a;b` the base gets `a` and the adj gets `b`; a
    /// single label tags both endpoints. A transition joins exactly two
    /// levels, so a label with more separators fails with `InvalidArgument`.
    pub(crate) fn assign_edge_level(
        &mut self,
        edge: EdgeId,
        base: NodeId,
        adj: NodeId,
        label: &str,
    ) -> Result<()> {
        if label.matches(LEVEL_SEPARATOR).count() > 1 {
            return Err(Error::InvalidArgument(format!(
                "edge level {label:?} joins more than two levels"
            )));
        }

        let mut record = self.read_edge(edge)?;
        let reversed = record.base != base;

        match EdgeLevel::parse(label) {
            EdgeLevel::Single(level) => {
                self.set_node_level(base, level)?;
                self.set_node_level(adj, level)?;
            }
            EdgeLevel::Transition(from, to) => {
                self.set_node_level(base, from)?;
                self.set_node_level(adj, to)?;
            }
        }

        if self.strategy == LevelStrategy::PerEdge {
            let stored = match (reversed, EdgeLevel::parse(label)) {
                (true, EdgeLevel::Transition(from, to)) => {
                    self.levels.put(&format!("{to}{LEVEL_SEPARATOR}{from}"))?
                }
                _ => self.levels.put(label)?,
            };
            record.level_ref =
                u32::try_from(stored).map_err(|_| Error::ReferenceOverflow(stored as u64, "edge"))?;
            self.write_edge(edge, record)?;
        }
        Ok(())
    }

    /// Level of `(base -> adj)` as seen from `base`
    pub(crate) fn edge_level(
        &self,
        record: &EdgeRecord,
        base: NodeId,
        adj: NodeId,
    ) -> Result<EdgeLevel<'_>> {
        match self.strategy {
            LevelStrategy::PerEdge => {
                let level = EdgeLevel::parse(self.levels.get(LevelRef::from(record.level_ref))?);
                match level {
                    EdgeLevel::Transition(from, to) if record.base != base => {
                        Ok(EdgeLevel::Transition(to, from))
                    }
                    other => Ok(other),
                }
            }
            LevelStrategy::NodeDerived => {
                Ok(EdgeLevel::from_endpoints(self.node_level(base)?, self.node_level(adj)?))
            }
        }
    }

    /// Appends pillar geometry for `edge`, given in stored orientation
    pub(crate) fn store_pillars(&mut self, edge: EdgeId, pillars: &[GeoPoint]) -> Result<()> {
        let mut record = self.read_edge(edge)?;
        if pillars.is_empty() {
            record.geometry = 0;
            return self.write_edge(edge, record);
        }

        let count = u32::try_from(pillars.len())
            .map_err(|_| Error::InvalidArgument(format!("{} pillars exceed u32", pillars.len())))?;

        let mut buf = Vec::with_capacity(4 + pillars.len() * 16);
        buf.extend_from_slice(&count.to_le_bytes());
        for p in pillars {
            buf.extend_from_slice(&p.lat.to_le_bytes());
            buf.extend_from_slice(&p.lon.to_le_bytes());
        }

        let offset = self.geometry_cursor;
        self.geometry.write_at(offset as usize, &buf)?;
        self.geometry_cursor += buf.len() as u64;

        record.geometry = offset;
        self.write_edge(edge, record)
    }

    /// Reads the pillars of an edge in stored orientation
    pub(crate) fn read_pillars(&self, record: &EdgeRecord) -> Result<Vec<GeoPoint>> {
        if record.geometry == 0 {
            return Ok(Vec::new());
        }

        let offset = record.geometry as usize;
        let count = read_u32(self.geometry.bytes(offset, 4)?, 0) as usize;
        let len = count * 16;
        if (offset + 4 + len) as u64 > self.geometry_cursor {
            return Err(Error::Corrupt(format!("geometry record at {offset} runs past the cursor")));
        }

        let bytes = self.geometry.bytes(offset + 4, len)?;
        Ok(bytes
            .chunks_exact(16)
            .map(|chunk| GeoPoint::new(read_f64(chunk, 0), read_f64(chunk, 8)))
            .collect())
    }

    pub(crate) fn set_edge_kind(&mut self, edge: EdgeId, kind: EdgeKind) -> Result<()> {
        let mut record = self.read_edge(edge)?;
        record.kind = kind;
        self.write_edge(edge, record)
    }

    pub(crate) fn set_edge_access(&mut self, edge: EdgeId, access: u8) -> Result<()> {
        let mut record = self.read_edge(edge)?;
        record.access = access;
        self.write_edge(edge, record)
    }

    // Record I/O

    pub(crate) fn read_node(&self, node: NodeId) -> Result<NodeRecord> {
        if node >= self.node_count {
            return Err(Error::NodeOutOfBounds { node, count: self.node_count });
        }
        let bytes = self.nodes.bytes(node as usize * NODE_RECORD_SIZE, NODE_RECORD_SIZE)?;
        Ok(NodeRecord::from_bytes(bytes))
    }

    fn write_node(&mut self, node: NodeId, record: NodeRecord) -> Result<()> {
        self.nodes.write_at(node as usize * NODE_RECORD_SIZE, &record.to_bytes())?;
        Ok(())
    }

    pub(crate) fn read_edge(&self, edge: EdgeId) -> Result<EdgeRecord> {
        if edge >= self.edge_count {
            return Err(Error::EdgeOutOfBounds { edge, count: self.edge_count });
        }
        let bytes = self.edges.bytes(edge as usize * EDGE_RECORD_SIZE, EDGE_RECORD_SIZE)?;
        EdgeRecord::from_bytes(bytes)
    }

    fn write_edge(&mut self, edge: EdgeId, record: EdgeRecord) -> Result<()> {
        self.edges.write_at(edge as usize * EDGE_RECORD_SIZE, &record.to_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_node_record_layout() {
        let record = NodeRecord { lat: 52.5, lon: 13.4, first_edge: 7, level: NO_LEVEL };
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), NODE_RECORD_SIZE);
        assert_eq!(NodeRecord::from_bytes(&bytes), record);
    }

    #[test]
    fn test_edge_record_rejects_unknown_kind() {
        let record = EdgeRecord {
            base: 1,
            adj: 2,
            link_base: NO_EDGE,
            link_adj: 0,
            distance: 12.5,
            geometry: 0,
            level_ref: 3,
            kind: EdgeKind::Stairs,
            access: ACCESS_FORWARD,
        };
        let mut bytes = record.to_bytes();
        assert_eq!(EdgeRecord::from_bytes(&bytes).unwrap(), record);

        bytes[36] = 200;
        assert!(matches!(EdgeRecord::from_bytes(&bytes), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_adjacency_lists() {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
        let a = graph.add_node(0.0, 0.0).unwrap();
        let b = graph.add_node(0.0, 0.001).unwrap();
        let c = graph.add_node(0.001, 0.0).unwrap();
        graph.create_edge(a, b, 100.0).unwrap();
        graph.create_edge(a, c, 110.0).unwrap();

        let mut at_a: Vec<NodeId> =
            graph.edges_at(a).unwrap().map(|e| e.unwrap().adj_node()).collect();
        at_a.sort();
        assert_eq!(at_a, vec![b, c]);

        let at_b: Vec<NodeId> = graph.edges_at(b).unwrap().map(|e| e.unwrap().adj_node()).collect();
        assert_eq!(at_b, vec![a]);
    }

    #[test]
    fn test_loop_edge_rejected() {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
        let a = graph.add_node(0.0, 0.0).unwrap();
        assert!(matches!(graph.create_edge(a, a, 1.0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_bounds_tracked() {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
        assert!(graph.bounds().is_empty());
        graph.add_node(1.0, 2.0).unwrap();
        graph.add_node(3.0, 4.0).unwrap();
        assert!(graph.bounds().contains(2.0, 3.0));
        assert!(!graph.bounds().contains(5.0, 3.0));
    }
}
