//! Storey - Level-aware indoor routing over an on-disk graph store
//!
//! Storey routes pedestrians through multi-storey buildings. Every node of
//! the graph carries the level (floor) it lies on, edges either stay on one
//! level or connect two (stairs, elevators), and each waypoint of a request
//! names the level it is on. Snapping honours that level, so a waypoint on
//! floor 2 never lands on a corridor of floor 1 directly underneath.
//!
//! # Features
//!
//! - Memory-mapped, page-aligned graph and level dictionary files
//! - Per-edge or node-derived level storage, fixed per graph
//! - Level-filtered nearest-edge lookup backed by an R-tree
//! - Dijkstra and A* with node- or edge-based traversal
//! - Route geometry annotated with a level on every point
//!
//! # Example
//!
//! ```no_run
//! use storey_core::{GraphOptions, LevelAwareMut, LevelGraph, RouteRequest, Router, RouterOptions, Waypoint};
//!
//! # fn main() -> storey_core::Result<()> {
//! let mut graph = LevelGraph::open("campus.storey", GraphOptions::default())?;
//!
//! let a = graph.add_node(52.5200, 13.4050)?;
//! let b = graph.add_node(52.5201, 13.4050)?;
//! let c = graph.add_node(52.5201, 13.4051)?;
//! graph.create_edge(a, b, 11.1)?.set_level("0")?;
//! graph.create_edge(b, c, 6.8)?.set_level("0;1")?;
//! graph.flush()?;
//!
//! let router = Router::new(graph, RouterOptions::default())?;
//! let request = RouteRequest::new(vec![
//!     Waypoint::new(52.5200, 13.4050, "0"),
//!     Waypoint::new(52.5201, 13.4051, "1"),
//! ]);
//!
//! let response = router.route(&request)?;
//! for (point, level) in response.points.iter() {
//!     println!("{},{} on {level}", point.lat, point.lon);
//! }
//! # Ok(())
//! # }
//! ```

pub mod dictionary;
pub mod edge;
pub mod error;
pub mod filter;
pub mod geo;
pub mod graph;
#[cfg(feature = "internals")]
pub mod header;
#[cfg(not(feature = "internals"))]
pub(crate) mod header;
pub mod level;
pub mod location_index;
pub mod path;
pub mod point_list;
pub mod query_graph;
pub mod request;
pub mod response;
pub mod router;
pub mod routing;

#[cfg(feature = "internals")]
pub mod storage;
#[cfg(not(feature = "internals"))]
pub(crate) mod storage;

pub use dictionary::{LevelDictionary, LevelRef, NO_LEVEL_REF};
pub use edge::{EdgeKind, EdgeMut, EdgeRef, EdgeState, LevelAware, LevelAwareMut};
pub use error::{Error, Result};
pub use filter::{AllEdges, Both, EdgeFilter, LevelEdgeFilter, Profile};
pub use geo::{BBox, GeoPoint};
pub use graph::{EdgeId, GraphOptions, LevelGraph, LevelStrategy, NodeId};
pub use level::{EdgeLevel, LEVEL_SEPARATOR, Level, MAX_LEVEL_BYTES};
pub use location_index::{LocationIndex, QueryResult, SnappedPosition};
pub use path::Path;
pub use point_list::PointList;
pub use query_graph::{QueryGraph, VirtualEdgeRef};
pub use request::{Heading, RouteRequest, Waypoint};
pub use response::{RouteFailure, RouteResponse, RoutedPath};
pub use router::{Router, RouterOptions};
pub use routing::{
    Algorithm, AlgorithmFactory, AlgorithmOptions, DefaultAlgorithmFactory, RoutingAlgorithm, TraversalMode,
    Weighting,
};
