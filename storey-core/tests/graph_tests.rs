//! Integration tests for the level-augmented graph store.

use storey_core::{
    EdgeKind, EdgeLevel, Error, GeoPoint, GraphOptions, LevelAware, LevelAwareMut, LevelGraph, LevelStrategy,
    NodeId,
};
use tempfile::TempDir;

fn options(strategy: LevelStrategy) -> GraphOptions {
    GraphOptions { strategy }
}

/// a(0) - b(0) -[stairs 0;1]- c(1)
fn build_stairs(graph: &mut LevelGraph) -> (NodeId, NodeId, NodeId) {
    let a = graph.add_node(0.0, 0.0).unwrap();
    let b = graph.add_node(0.0, 0.0001).unwrap();
    let c = graph.add_node(0.0001, 0.0001).unwrap();

    graph.create_edge(a, b, 11.0).unwrap().set_level("0").unwrap();
    let mut stairs = graph.create_edge(b, c, 11.0).unwrap();
    stairs.set_level("0;1").unwrap();
    stairs.set_kind(EdgeKind::Stairs).unwrap();
    (a, b, c)
}

#[test]
fn test_node_levels_tagged_by_edge_assignment() {
    for strategy in [LevelStrategy::PerEdge, LevelStrategy::NodeDerived] {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), options(strategy)).unwrap();
        let (a, b, c) = build_stairs(&mut graph);

        assert_eq!(graph.node_level(a).unwrap(), "0");
        assert_eq!(graph.node_level(b).unwrap(), "0");
        assert_eq!(graph.node_level(c).unwrap(), "1");
    }
}

#[test]
fn test_level_visible_through_every_accessor() {
    for strategy in [LevelStrategy::PerEdge, LevelStrategy::NodeDerived] {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), options(strategy)).unwrap();
        let (_, b, c) = build_stairs(&mut graph);

        // Single edge, stored orientation and reversed
        let forward = graph.edge(1, Some(c)).unwrap();
        assert_eq!(forward.level().unwrap(), EdgeLevel::Transition("0", "1"));
        let backward = graph.edge(1, Some(b)).unwrap();
        assert_eq!(backward.level().unwrap(), EdgeLevel::Transition("1", "0"));

        // All-edges iteration
        let levels: Vec<String> =
            graph.all_edges().map(|e| e.unwrap().level().unwrap().to_string()).collect();
        assert_eq!(levels, vec!["0", "0;1"]);

        // Edges at the upper node, oriented away from it
        let at_c: Vec<String> =
            graph.edges_at(c).unwrap().map(|e| e.unwrap().level().unwrap().to_string()).collect();
        assert_eq!(at_c, vec!["1;0"]);
    }
}

#[test]
fn test_level_assigned_through_reversed_handle() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), options(LevelStrategy::PerEdge)).unwrap();
    let a = graph.add_node(0.0, 0.0).unwrap();
    let b = graph.add_node(0.0, 0.0001).unwrap();
    graph.create_edge(a, b, 11.0).unwrap();

    // Seen from b: b is on 2, a on 3
    graph.edge_mut(0, Some(a)).unwrap().set_level("2;3").unwrap();

    assert_eq!(graph.node_level(b).unwrap(), "2");
    assert_eq!(graph.node_level(a).unwrap(), "3");
    assert_eq!(graph.edge(0, Some(b)).unwrap().level().unwrap(), EdgeLevel::Transition("3", "2"));
    assert_eq!(graph.edge(0, Some(a)).unwrap().level().unwrap(), EdgeLevel::Transition("2", "3"));
}

#[test]
fn test_transition_round_trips_through_setting_handle() {
    for strategy in [LevelStrategy::PerEdge, LevelStrategy::NodeDerived] {
        let dir = TempDir::new().unwrap();
        let mut graph = LevelGraph::open(dir.path(), options(strategy)).unwrap();
        let a = graph.add_node(0.0, 0.0).unwrap();
        let b = graph.add_node(0.0, 0.0001).unwrap();
        graph.create_edge(a, b, 11.0).unwrap();

        let mut handle = graph.edge_mut(0, Some(a)).unwrap();
        handle.set_level("0;1").unwrap();
        assert_eq!(handle.level().unwrap().to_string(), "0;1");

        // Three floors cannot be split across two endpoints
        let err = handle.set_level("0;1;2").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(handle.level().unwrap().to_string(), "0;1");

        assert_eq!(graph.edge(0, Some(a)).unwrap().level().unwrap().to_string(), "0;1");
        assert_eq!(graph.edge(0, Some(b)).unwrap().level().unwrap().to_string(), "1;0");
    }
}

#[test]
fn test_node_level_must_be_single() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let a = graph.add_node(0.0, 0.0).unwrap();
    graph.set_node_level(a, "2").unwrap();

    assert!(matches!(graph.set_node_level(a, "2;3"), Err(Error::InvalidArgument(_))));
    assert_eq!(graph.node_level(a).unwrap(), "2");
    assert_eq!(graph.node_level_ref(a).unwrap(), 1);
}

#[test]
fn test_level_assigned_through_mutable_cursor() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let hub = graph.add_node(0.0, 0.0).unwrap();
    for lon in [0.0001, 0.0002, 0.0003] {
        let spoke = graph.add_node(0.0, lon).unwrap();
        graph.create_edge(hub, spoke, 10.0).unwrap();
    }

    let mut cursor = graph.edges_at_mut(hub).unwrap();
    while let Some(edge) = cursor.next_edge() {
        edge.unwrap().set_level("UG").unwrap();
    }

    for edge in graph.all_edges() {
        assert_eq!(edge.unwrap().level().unwrap(), EdgeLevel::Single("UG"));
    }
}

#[test]
fn test_unset_endpoint_takes_other_label() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), options(LevelStrategy::NodeDerived)).unwrap();
    let a = graph.add_node(0.0, 0.0).unwrap();
    let b = graph.add_node(0.0, 0.0001).unwrap();
    graph.create_edge(a, b, 11.0).unwrap();
    graph.set_node_level(a, "4").unwrap();

    let edge = graph.edge(0, None).unwrap();
    assert_eq!(edge.level().unwrap(), EdgeLevel::Single("4"));
}

#[test]
fn test_frozen_graph_rejects_structural_changes() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let (a, _, c) = build_stairs(&mut graph);
    graph.freeze();

    assert!(matches!(graph.add_node(1.0, 1.0), Err(Error::FrozenGraph(_))));
    assert!(matches!(graph.create_edge(a, c, 5.0), Err(Error::FrozenGraph(_))));

    // Level edits remain possible
    graph.edge_mut(0, None).unwrap().set_level("G").unwrap();
    assert_eq!(graph.node_level(a).unwrap(), "G");
}

#[test]
fn test_persistence_across_reopen() {
    for strategy in [LevelStrategy::PerEdge, LevelStrategy::NodeDerived] {
        let dir = TempDir::new().unwrap();
        {
            let mut graph = LevelGraph::open(dir.path(), options(strategy)).unwrap();
            let (_, b, _) = build_stairs(&mut graph);
            graph.edge_mut(1, Some(b)).unwrap().set_geometry(&[GeoPoint::new(0.00005, 0.0001)]).unwrap();
            graph.flush().unwrap();
        }

        let graph = LevelGraph::open(dir.path(), options(strategy)).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.strategy(), strategy);

        let stairs = graph.edge(1, None).unwrap();
        assert_eq!(stairs.kind(), EdgeKind::Stairs);
        assert_eq!(stairs.level().unwrap(), EdgeLevel::Transition("0", "1"));
        assert_eq!(stairs.pillars().unwrap(), vec![GeoPoint::new(0.00005, 0.0001)]);

        assert_eq!(graph.known_levels().len(), 2);
        assert!(graph.bounds().contains(0.00005, 0.00005));
    }
}

#[test]
fn test_strategy_fixed_at_creation() {
    let dir = TempDir::new().unwrap();
    {
        let mut graph = LevelGraph::open(dir.path(), options(LevelStrategy::PerEdge)).unwrap();
        graph.flush().unwrap();
    }

    let err = LevelGraph::open(dir.path(), options(LevelStrategy::NodeDerived)).unwrap_err();
    assert!(matches!(
        err,
        Error::StrategyMismatch { stored: LevelStrategy::PerEdge, requested: LevelStrategy::NodeDerived }
    ));
}

#[test]
fn test_one_way_access_relative_to_handle() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let a = graph.add_node(0.0, 0.0).unwrap();
    let b = graph.add_node(0.0, 0.0001).unwrap();
    graph.create_edge(a, b, 11.0).unwrap();

    // Only b -> a is allowed
    graph.edge_mut(0, Some(a)).unwrap().set_access(true, false).unwrap();

    assert!(graph.edge(0, Some(a)).unwrap().is_forward());
    assert!(!graph.edge(0, Some(b)).unwrap().is_forward());
    assert!(graph.edge(0, Some(b)).unwrap().is_backward());
}

#[test]
fn test_out_of_range_access() {
    let dir = TempDir::new().unwrap();
    let mut graph = LevelGraph::open(dir.path(), GraphOptions::default()).unwrap();
    let (a, _, c) = build_stairs(&mut graph);

    assert!(matches!(graph.edge(7, None), Err(Error::EdgeOutOfBounds { edge: 7, .. })));
    assert!(matches!(graph.node_point(42), Err(Error::NodeOutOfBounds { node: 42, .. })));
    // Edge 0 joins a and b, not c
    assert!(matches!(graph.edge(0, Some(c)), Err(Error::NotAdjacent { edge: 0, .. })));
    assert!(graph.edge(0, Some(a)).is_ok());
}
