//! Traversal predicates applied by lookup and search.

use crate::edge::{EdgeKind, EdgeState};
use crate::error::{Error, Result};
use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Admits or rejects an edge during lookup or search
pub trait EdgeFilter {
    fn accept(&self, edge: &EdgeState<'_>) -> bool;

    /// Conjunction of two filters
    fn and<F: EdgeFilter>(self, other: F) -> Both<Self, F>
    where
        Self: Sized,
    {
        Both(self, other)
    }
}

impl<F: EdgeFilter + ?Sized> EdgeFilter for &F {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        (**self).accept(edge)
    }
}

impl<F: EdgeFilter + ?Sized> EdgeFilter for Box<F> {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        (**self).accept(edge)
    }
}

/// Accepts every edge
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEdges;

impl EdgeFilter for AllEdges {
    #[inline]
    fn accept(&self, _edge: &EdgeState<'_>) -> bool {
        true
    }
}

/// Accepts an edge only if both filters do
#[derive(Debug, Clone, Copy)]
pub struct Both<A, B>(pub A, pub B);

impl<A: EdgeFilter, B: EdgeFilter> EdgeFilter for Both<A, B> {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        self.0.accept(edge) && self.1.accept(edge)
    }
}

/// Admits edges on the current level.
///
/// An edge is accepted if its level equals the current level or, for a
/// transition edge, if either side does. Virtual edges and edges whose level
/// cannot be read are rejected. The optional set of known levels is only used
/// to validate [`set_current_level`](Self::set_current_level).
#[derive(Debug, Clone)]
pub struct LevelEdgeFilter {
    current: Level,
    known: Option<Arc<HashSet<Level>>>,
}

impl LevelEdgeFilter {
    /// Filter without validation data: any label is accepted at face value
    pub fn new(current: impl Into<Level>) -> Self {
        Self { current: current.into(), known: None }
    }

    /// Filter validated against the building's known levels
    ///
    /// # Errors
    ///
    /// `InvalidLevel` if `current` is not in `known`.
    pub fn with_known_levels(current: impl Into<Level>, known: Arc<HashSet<Level>>) -> Result<Self> {
        let mut filter = Self { current: Level::unset(), known: Some(known) };
        filter.set_current_level(current)?;
        Ok(filter)
    }

    /// Level edges must touch
    pub fn current_level(&self) -> &Level {
        &self.current
    }

    /// Valid levels, if validation was requested
    pub fn known_levels(&self) -> Option<&HashSet<Level>> {
        self.known.as_deref()
    }

    /// Changes the current level
    ///
    /// # Errors
    ///
    /// `InvalidLevel` if a known level set was supplied and `level` is not in it.
    pub fn set_current_level(&mut self, level: impl Into<Level>) -> Result<()> {
        let level = level.into();
        if let Some(known) = &self.known {
            if !known.contains(&level) {
                return Err(Error::InvalidLevel { level: level.to_string() });
            }
        }
        self.current = level;
        Ok(())
    }
}

impl EdgeFilter for LevelEdgeFilter {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        let Some(aware) = edge.level_aware() else {
            return false;
        };
        match aware.level() {
            Ok(level) => level.touches(self.current.as_str()),
            Err(e) => {
                tracing::trace!(edge = edge.edge(), error = %e, "Edge level unreadable, rejected");
                false
            }
        }
    }
}

/// Access profile selecting which edge kinds may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Footways, stairs and elevators
    #[default]
    Indoor,
    /// Everything except stairs
    NoStairs,
    /// Everything except elevators
    NoElevators,
}

impl Profile {
    /// True if edges of `kind` may be used
    pub fn allows(&self, kind: EdgeKind) -> bool {
        match self {
            Self::Indoor => true,
            Self::NoStairs => kind != EdgeKind::Stairs,
            Self::NoElevators => kind != EdgeKind::Elevator,
        }
    }
}

impl EdgeFilter for Profile {
    #[inline]
    fn accept(&self, edge: &EdgeState<'_>) -> bool {
        self.allows(edge.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(labels: &[&str]) -> Arc<HashSet<Level>> {
        Arc::new(labels.iter().map(|l| Level::new(*l)).collect())
    }

    #[test]
    fn test_set_current_level_without_known_set() {
        let mut filter = LevelEdgeFilter::new("0");
        filter.set_current_level("anything").unwrap();
        assert_eq!(filter.current_level().as_str(), "anything");
        assert!(filter.known_levels().is_none());
    }

    #[test]
    fn test_set_current_level_validated() {
        let mut filter = LevelEdgeFilter::with_known_levels("0", known(&["0", "1"])).unwrap();
        filter.set_current_level("1").unwrap();

        let err = filter.set_current_level("7").unwrap_err();
        assert!(matches!(err, Error::InvalidLevel { ref level } if level == "7"));
        assert_eq!(filter.current_level().as_str(), "1");
    }

    #[test]
    fn test_construction_validated() {
        let err = LevelEdgeFilter::with_known_levels("2", known(&["0", "1"])).unwrap_err();
        assert!(matches!(err, Error::InvalidLevel { .. }));
    }

    #[test]
    fn test_profile_kinds() {
        assert!(Profile::Indoor.allows(EdgeKind::Stairs));
        assert!(!Profile::NoStairs.allows(EdgeKind::Stairs));
        assert!(Profile::NoStairs.allows(EdgeKind::Elevator));
        assert!(!Profile::NoElevators.allows(EdgeKind::Elevator));
        assert!(Profile::NoElevators.allows(EdgeKind::Footway));
    }
}
