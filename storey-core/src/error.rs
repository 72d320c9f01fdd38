//! Crate error type.
//!
//! Ordinary request failures (a waypoint that cannot be snapped, a search that
//! hits the visited-node limit) are not errors at this level; they are carried
//! in [`RouteResponse::errors`](crate::RouteResponse). Everything here is either a
//! validation error raised by the call that introduced it, a structural
//! problem with the graph, or a broken search invariant.

/// Errors raised by the level dictionary, the graph store and the router.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stored dictionary reference that resolves to nothing
    #[error("Invalid level reference {reference}: {reason}")]
    InvalidReference { reference: i64, reason: &'static str },

    /// Label outside the building's level set
    #[error("Level '{level}' is not one of the levels known for this building")]
    InvalidLevel { level: String },

    /// Waypoint heading outside [0, 360]
    #[error("Heading {0} must be in range [0,360] or NaN")]
    InvalidHeading(f64),

    /// Structural change after [`LevelGraph::freeze`](crate::LevelGraph::freeze)
    #[error("Cannot create {0} if graph is already frozen")]
    FrozenGraph(&'static str),

    /// Dictionary grew past what the record field can hold
    #[error("Level reference {0} does not fit the {1} level field")]
    ReferenceOverflow(u64, &'static str),

    /// Node id past the node count
    #[error("Node {node} out of bounds (node count is {count})")]
    NodeOutOfBounds { node: u32, count: u32 },

    /// Edge id past the edge count
    #[error("Edge {edge} out of bounds (edge count is {count})")]
    EdgeOutOfBounds { edge: u32, count: u32 },

    /// Handle node is neither endpoint of the edge
    #[error("Edge {edge} is not adjacent to node {node}")]
    NotAdjacent { edge: u32, node: u32 },

    /// Unreadable or inconsistent on-disk data
    #[error("Corrupted graph data: {0}")]
    Corrupt(String),

    /// Graph reopened with a different [`LevelStrategy`](crate::LevelStrategy)
    #[error("Level strategy mismatch: graph stores {stored:?}, requested {requested:?}")]
    StrategyMismatch { stored: crate::LevelStrategy, requested: crate::LevelStrategy },

    /// Bad caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Search returned no candidate for a leg
    #[error("At least one path has to be returned for leg {leg} ({from} -> {to})")]
    EmptyPathList { leg: usize, from: u32, to: u32 },

    /// Search produced a path with negative travel time
    #[error("Time was negative ({time_ms} ms) for path {index} of leg {leg}")]
    NegativeTime { leg: usize, index: usize, time_ms: i64 },

    /// Geometry and per-point levels disagree in length
    #[error("Point list and level array must have the same size: {points} points, {levels} levels")]
    PointListMismatch { points: usize, levels: usize },

    /// Backing file operation failed
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for broken search invariants and structural damage: conditions
    /// that indicate a bug in a collaborator or the graph, never bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::EmptyPathList { .. }
                | Self::NegativeTime { .. }
                | Self::FrozenGraph(_)
                | Self::InvalidReference { .. }
                | Self::Corrupt(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
