//! Integration tests for level-aware edge filtering.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use storey_core::{
    EdgeFilter, EdgeKind, EdgeState, Error, GraphOptions, Level, LevelAwareMut, LevelEdgeFilter, LevelGraph,
    LevelStrategy, LocationIndex, Profile, QueryGraph,
};
use tempfile::TempDir;

/// One edge per label, each between two fresh nodes
fn graph_with_labels(dir: &TempDir, strategy: LevelStrategy, labels: &[&str]) -> LevelGraph {
    let mut graph = LevelGraph::open(dir.path(), GraphOptions { strategy }).unwrap();
    for (i, label) in labels.iter().enumerate() {
        let lat = i as f64 * 0.001;
        let a = graph.add_node(lat, 0.0).unwrap();
        let b = graph.add_node(lat, 0.0001).unwrap();
        graph.create_edge(a, b, 11.0).unwrap().set_level(label).unwrap();
    }
    graph
}

fn accepted(graph: &LevelGraph, filter: &impl EdgeFilter) -> Vec<String> {
    graph
        .all_edges()
        .map(Result::unwrap)
        .filter(|edge| filter.accept(&EdgeState::Stored(*edge)))
        .map(|edge| graph.node_level(edge.base_node()).unwrap().to_string())
        .collect()
}

#[test]
fn test_level_filter_accepts_same_level_and_transitions() {
    for strategy in [LevelStrategy::PerEdge, LevelStrategy::NodeDerived] {
        let dir = TempDir::new().unwrap();
        let graph = graph_with_labels(&dir, strategy, &["2", "2;3", "1;2", "1", "3"]);
        let filter = LevelEdgeFilter::new("2");

        let edges: Vec<bool> =
            graph.all_edges().map(|e| filter.accept(&EdgeState::Stored(e.unwrap()))).collect();
        assert_eq!(edges, vec![true, true, true, false, false], "strategy {strategy:?}");
    }
}

#[test]
fn test_level_filter_checks_both_directions() {
    let dir = TempDir::new().unwrap();
    let graph = graph_with_labels(&dir, LevelStrategy::PerEdge, &["0;1"]);
    let filter = LevelEdgeFilter::new("1");

    let edge = graph.edge(0, None).unwrap();
    assert!(filter.accept(&EdgeState::Stored(edge)));
    assert!(filter.accept(&EdgeState::Stored(edge.detach())));
}

#[test]
fn test_level_filter_rejects_unset_edges() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let a = graph.add_node(0.0, 0.0).unwrap();
    let b = graph.add_node(0.0, 0.0001).unwrap();
    graph.create_edge(a, b, 11.0).unwrap();

    let filter = LevelEdgeFilter::new("0");
    assert!(accepted(&graph, &filter).is_empty());
}

#[test]
fn test_level_filter_rejects_virtual_edges() {
    let dir = TempDir::new().unwrap();
    let mut graph = graph_with_labels(&dir, LevelStrategy::NodeDerived, &["0"]);
    graph.freeze();

    let index = LocationIndex::build(&graph).unwrap();
    let filter = LevelEdgeFilter::new("0");
    let mut results = vec![index.find_closest(&graph, 0.00001, 0.00005, &filter).unwrap()];
    assert!(results[0].is_valid());

    let query_graph = QueryGraph::new(&graph, &mut results).unwrap();
    let virtual_node = results[0].closest_node;
    assert!(query_graph.is_virtual_node(virtual_node));

    let mut edges = Vec::new();
    query_graph.edges_at(virtual_node, &mut edges).unwrap();
    assert_eq!(edges.len(), 2);
    for edge in &edges {
        assert!(edge.is_virtual());
        assert!(edge.level_aware().is_none());
        assert!(!filter.accept(edge));
    }
}

#[test]
fn test_known_level_validation() {
    let known: Arc<HashSet<Level>> = Arc::new(["0", "1", "UG"].into_iter().map(Level::from).collect());

    let mut filter = LevelEdgeFilter::with_known_levels("0", Arc::clone(&known)).unwrap();
    filter.set_current_level("UG").unwrap();
    assert_eq!(filter.current_level().as_str(), "UG");

    let err = filter.set_current_level("7").unwrap_err();
    assert!(matches!(err, Error::InvalidLevel { ref level } if level == "7"));
    assert_eq!(filter.current_level().as_str(), "UG", "failed update keeps the previous level");

    assert!(matches!(LevelEdgeFilter::with_known_levels("9", known), Err(Error::InvalidLevel { .. })));
}

#[test]
fn test_level_and_profile_combined() {
    let dir = TempDir::new().unwrap();
    let mut graph = graph_with_labels(&dir, LevelStrategy::NodeDerived, &["0;1", "0;1"]);
    graph.edge_mut(0, None).unwrap().set_kind(EdgeKind::Stairs).unwrap();
    graph.edge_mut(1, None).unwrap().set_kind(EdgeKind::Elevator).unwrap();

    let no_stairs = LevelEdgeFilter::new("0").and(Profile::NoStairs);
    let edges: Vec<bool> =
        graph.all_edges().map(|e| no_stairs.accept(&EdgeState::Stored(e.unwrap()))).collect();
    assert_eq!(edges, vec![false, true]);
}

proptest! {
    #[test]
    fn prop_transition_accepted_from_either_side(
        current in "[A-Z0-9]{1,3}",
        other in "[a-z]{1,3}",
        current_first in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let label = if current_first { format!("{current};{other}") } else { format!("{other};{current}") };
        let graph = graph_with_labels(&dir, LevelStrategy::PerEdge, &[label.as_str()]);

        let edge = graph.edge(0, None).unwrap();
        prop_assert!(LevelEdgeFilter::new(current.as_str()).accept(&EdgeState::Stored(edge)));
        prop_assert!(!LevelEdgeFilter::new("-").accept(&EdgeState::Stored(edge)));
    }
}
