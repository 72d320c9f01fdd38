//! Spatial index for snapping waypoints onto edge geometry

use crate::edge::EdgeState;
use crate::error::Result;
use crate::filter::EdgeFilter;
use crate::geo::{GeoPoint, haversine_distance};
use crate::graph::{EdgeId, LevelGraph, NodeId};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use std::collections::HashSet;

/// Fraction of a segment within which a snap counts as hitting its end point
const SNAP_EPSILON: f64 = 1e-6;

/// Where on an edge a lookup landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnappedPosition {
    /// Exactly on a tower node (edge endpoint)
    Tower,
    /// On an interior geometry point
    Pillar,
    /// Strictly inside a segment
    Edge,
}

/// Outcome of [`LocationIndex::find_closest`].
///
/// Segment indexes and `t` refer to the edge in stored orientation.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Coordinates that were looked up
    pub query_point: GeoPoint,
    /// Closest admissible point on the edge geometry
    pub snapped_point: GeoPoint,
    /// Tower node for [`SnappedPosition::Tower`]; rewritten to a virtual node
    /// when the result is injected into a query graph
    pub closest_node: NodeId,
    /// Edge the point was snapped onto
    pub closest_edge: EdgeId,
    /// Index of the geometry segment hit
    pub segment: usize,
    /// Position along the segment in [0, 1)
    pub t: f64,
    /// Whether the snap hit a tower, a pillar or a segment
    pub position: SnappedPosition,
    /// Distance in meters from the query point to the snapped point
    pub distance_m: f64,
    valid: bool,
}

impl QueryResult {
    /// A result that resolved nothing
    pub fn invalid(lat: f64, lon: f64) -> Self {
        let point = GeoPoint::new(lat, lon);
        Self {
            query_point: point,
            snapped_point: point,
            closest_node: NodeId::MAX,
            closest_edge: EdgeId::MAX,
            segment: 0,
            t: 0.0,
            position: SnappedPosition::Tower,
            distance_m: f64::INFINITY,
            valid: false,
        }
    }

    /// False if no admissible edge was found
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// One geometry segment of a stored edge, projected to a local plane
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedSegment {
    from: [f64; 2],
    to: [f64; 2],
    edge: EdgeId,
    segment: u32,
}

impl IndexedSegment {
    /// Projection parameter of `point` clamped to [0, 1]
    fn project(&self, point: &[f64; 2]) -> f64 {
        let dx = self.to[0] - self.from[0];
        let dy = self.to[1] - self.from[1];
        let len_2 = dx * dx + dy * dy;
        if len_2 == 0.0 {
            return 0.0;
        }
        (((point[0] - self.from[0]) * dx + (point[1] - self.from[1]) * dy) / len_2).clamp(0.0, 1.0)
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.from, self.to)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let t = self.project(point);
        let x = self.from[0] + t * (self.to[0] - self.from[0]);
        let y = self.from[1] + t * (self.to[1] - self.from[1]);
        let dx = x - point[0];
        let dy = y - point[1];
        dx * dx + dy * dy
    }
}

/// Nearest-edge lookup over every geometry segment of a graph
#[derive(Debug)]
pub struct LocationIndex {
    tree: RTree<IndexedSegment>,
    /// Longitude scale of the equirectangular projection
    lon_scale: f64,
}

impl LocationIndex {
    /// Indexes every segment of every stored edge
    pub fn build(graph: &LevelGraph) -> Result<Self> {
        let lon_scale = graph.bounds().center_lat().to_radians().cos().max(1e-6);
        let project = |p: &GeoPoint| [p.lon * lon_scale, p.lat];

        let mut segments = Vec::new();
        for edge in graph.all_edges() {
            let edge = edge?;
            let points = edge.points()?;
            for (i, pair) in points.windows(2).enumerate() {
                segments.push(IndexedSegment {
                    from: project(&pair[0]),
                    to: project(&pair[1]),
                    edge: edge.edge(),
                    segment: i as u32,
                });
            }
        }

        tracing::debug!(segments = segments.len(), "Built location index");
        Ok(Self { tree: RTree::bulk_load(segments), lon_scale })
    }

    /// Number of indexed segments
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Snaps `(lat, lon)` to the nearest edge admitted by `filter`.
    ///
    /// Returns an invalid result if no indexed edge passes the filter.
    pub fn find_closest<F: EdgeFilter + ?Sized>(
        &self,
        graph: &LevelGraph,
        lat: f64,
        lon: f64,
        filter: &F,
    ) -> Result<QueryResult> {
        let query = [lon * self.lon_scale, lat];
        let mut rejected: HashSet<EdgeId> = HashSet::new();

        for candidate in self.tree.nearest_neighbor_iter(&query) {
            if rejected.contains(&candidate.edge) {
                continue;
            }

            let edge = graph.edge(candidate.edge, None)?;
            if !filter.accept(&EdgeState::Stored(edge)) {
                rejected.insert(candidate.edge);
                continue;
            }

            let points = edge.points()?;
            let segment = candidate.segment as usize;
            let t = candidate.project(&query);
            let towers = (edge.base_node(), edge.adj_node());
            return Ok(snap(GeoPoint::new(lat, lon), &points, edge.edge(), towers, segment, t));
        }

        Ok(QueryResult::invalid(lat, lon))
    }
}

/// Builds the result for a hit at fraction `t` of `segment` of an edge whose
/// full geometry (towers included) is `points`
fn snap(
    query_point: GeoPoint,
    points: &[GeoPoint],
    edge: EdgeId,
    towers: (NodeId, NodeId),
    segment: usize,
    t: f64,
) -> QueryResult {
    let last_point = points.len() - 1;

    // Hits on a segment end point become (next index, t = 0)
    let (segment, t) = if t >= 1.0 - SNAP_EPSILON { (segment + 1, 0.0) } else { (segment, t) };

    let (position, snapped_point, closest_node) = if t <= SNAP_EPSILON {
        let point = points[segment];
        if segment == 0 {
            (SnappedPosition::Tower, point, towers.0)
        } else if segment == last_point {
            (SnappedPosition::Tower, point, towers.1)
        } else {
            (SnappedPosition::Pillar, point, NodeId::MAX)
        }
    } else {
        let from = points[segment];
        let to = points[segment + 1];
        let point = GeoPoint::new(from.lat + t * (to.lat - from.lat), from.lon + t * (to.lon - from.lon));
        (SnappedPosition::Edge, point, NodeId::MAX)
    };

    QueryResult {
        query_point,
        snapped_point,
        closest_node,
        closest_edge: edge,
        segment,
        t: if position == SnappedPosition::Edge { t } else { 0.0 },
        position,
        distance_m: haversine_distance(query_point, snapped_point),
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Vec<GeoPoint> {
        vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001), GeoPoint::new(0.0, 0.002)]
    }

    #[test]
    fn test_snap_inside_segment() {
        let result = snap(GeoPoint::new(0.0001, 0.0005), &line(), 3, (10, 11), 0, 0.5);
        assert!(result.is_valid());
        assert_eq!(result.position, SnappedPosition::Edge);
        assert_eq!(result.segment, 0);
        assert!((result.snapped_point.lon - 0.0005).abs() < 1e-12);
        assert!(result.distance_m > 10.0 && result.distance_m < 12.0);
    }

    #[test]
    fn test_snap_to_towers() {
        let start = snap(GeoPoint::new(0.0, -0.001), &line(), 3, (10, 11), 0, 0.0);
        assert_eq!(start.position, SnappedPosition::Tower);
        assert_eq!(start.closest_node, 10);

        let end = snap(GeoPoint::new(0.0, 0.003), &line(), 3, (10, 11), 1, 1.0);
        assert_eq!(end.position, SnappedPosition::Tower);
        assert_eq!(end.closest_node, 11);
        assert_eq!(end.segment, 2);
    }

    #[test]
    fn test_snap_to_pillar() {
        let result = snap(GeoPoint::new(0.001, 0.001), &line(), 3, (10, 11), 0, 1.0);
        assert_eq!(result.position, SnappedPosition::Pillar);
        assert_eq!(result.segment, 1);
        assert_eq!(result.t, 0.0);
    }

    #[test]
    fn test_segment_distance() {
        let segment = IndexedSegment { from: [0.0, 0.0], to: [2.0, 0.0], edge: 0, segment: 0 };
        assert_eq!(segment.distance_2(&[1.0, 1.0]), 1.0);
        assert_eq!(segment.distance_2(&[3.0, 0.0]), 1.0);
        assert_eq!(segment.project(&[-1.0, 0.0]), 0.0);
    }
}
