//! End-to-end scenarios for the incremental triangulation.
//!
//! Each scenario drives the engine through a short sequence of edits and checks
//! the resulting junction tree and maximal prime subgraph tree.

use std::collections::BTreeSet;

use jtree_rs::clique_graph::CliqueGraph;
use jtree_rs::default_triangulation::DefaultTriangulation;
use jtree_rs::elimination::{EliminationHeuristic, TriangulationConfig};
use jtree_rs::error::TriangulationError;
use jtree_rs::graph::UndiGraph;
use jtree_rs::incremental::{IncrementalTriangulation, UpdateStats};
use jtree_rs::triangulation::Triangulation;
use jtree_rs::types::{Edge, NodeId, NodeSet, NodeWeights};
use num_bigint::BigUint;
use test_log::test;

fn labels(tree: &CliqueGraph) -> Vec<NodeSet> {
    let mut labels: Vec<NodeSet> = tree.cliques().map(|(_, c)| c.clone()).collect();
    labels.sort();
    labels
}

fn with_nodes(nodes: impl IntoIterator<Item = NodeId>) -> IncrementalTriangulation {
    let mut it = IncrementalTriangulation::default();
    for node in nodes {
        it.add_node(node, 2);
    }
    it
}

fn four_cycle() -> IncrementalTriangulation {
    let mut it = with_nodes(1..=4);
    for (x, y) in [(1, 2), (2, 3), (3, 4), (4, 1)] {
        it.add_edge(x, y);
    }
    it
}

/// Properties 1-5, checked through the public API only.
fn assert_valid(it: &mut IncrementalTriangulation) {
    it.check().unwrap();

    let graph = it.graph().clone();
    for tree in [it.junction_tree().unwrap().clone(), it.max_prime_junction_tree().unwrap().clone()] {
        assert!(tree.is_join_tree());
        for node in graph.nodes() {
            assert!(tree.container_clique(node).is_some(), "node {} is not covered", node);
        }
        for edge in graph.edges() {
            assert!(
                tree.cliques()
                    .any(|(_, c)| c.contains(&edge.first()) && c.contains(&edge.second())),
                "edge {} is not covered",
                edge
            );
        }
    }

    let order = it.elimination_order().unwrap().to_vec();
    let sorted: BTreeSet<NodeId> = order.iter().copied().collect();
    assert_eq!(sorted.len(), order.len());
    assert!(sorted.iter().copied().eq(graph.nodes()));
    let ranks: BTreeSet<usize> = order.iter().map(|&n| it.elimination_order_of(n).unwrap()).collect();
    assert!(ranks.iter().copied().eq(0..order.len()));

    let jt = it.junction_tree().unwrap().clone();
    for node in graph.nodes() {
        let clique = it.created_junction_tree_clique(node).unwrap();
        assert!(jt.clique(clique).contains(&node));
    }
}

#[test]
fn scenario_a_path_needs_no_triangulation() {
    let mut it = with_nodes(1..=3);
    it.add_edge(1, 2);
    it.add_edge(2, 3);

    let jt = it.junction_tree().unwrap().clone();
    assert_eq!(it.stats().regions, 0);
    assert_eq!(labels(&jt), vec![NodeSet::from([1, 2]), NodeSet::from([2, 3])]);
    let (a, b) = jt.edges().next().unwrap();
    assert_eq!(jt.separator(a, b), NodeSet::from([2]));
    assert_eq!(it.elimination_order().unwrap().len(), 3);
    assert_eq!(it.stats().regions, 0);
    assert_valid(&mut it);
}

#[test]
fn scenario_b_triangle() {
    let mut it = with_nodes(1..=3);
    it.add_edge(1, 2);
    it.add_edge(2, 3);
    it.add_edge(1, 3);

    assert_eq!(labels(it.junction_tree().unwrap()), vec![NodeSet::from([1, 2, 3])]);
    assert_eq!(labels(it.max_prime_junction_tree().unwrap()), vec![NodeSet::from([1, 2, 3])]);
    assert!(it.fill_ins().unwrap().is_empty());
    assert_valid(&mut it);
}

#[test]
fn scenario_c_four_cycle_gets_a_chord() {
    let mut it = four_cycle();
    it.update_triangulation().unwrap();
    assert!(it.stats().regions >= 1);

    let jt = it.junction_tree().unwrap().clone();
    assert_eq!(jt.size(), 2);
    assert!(jt.cliques().all(|(_, c)| c.len() == 3));

    let fill_ins = it.fill_ins().unwrap().clone();
    assert_eq!(fill_ins.len(), 1);
    for edge in &fill_ins {
        assert!(!it.graph().exists_edge(edge.first(), edge.second()));
    }
    assert_valid(&mut it);
}

#[test]
fn scenario_d_breaking_the_cycle() {
    let mut it = four_cycle();
    it.update_triangulation().unwrap();
    it.erase_edge(Edge::new(1, 2));
    assert!(!it.graph().exists_edge(1, 2));

    let jt = it.junction_tree().unwrap().clone();
    assert_eq!(
        labels(&jt),
        vec![NodeSet::from([1, 4]), NodeSet::from([2, 3]), NodeSet::from([3, 4])]
    );
    assert!(it.fill_ins().unwrap().is_empty());
    assert_valid(&mut it);
}

#[test]
fn scenario_e_erase_node_with_several_edges() {
    let mut it = four_cycle();
    it.add_node(5, 3);
    for y in [1, 2, 3] {
        it.add_edge(5, y);
    }
    assert_valid(&mut it);

    it.erase_node(5);
    assert!(!it.graph().exists_node(5));
    assert!(!it.weights().contains_key(&5));
    assert!(it.junction_tree().unwrap().cliques().all(|(_, c)| !c.contains(&5)));
    assert!(it.max_prime_junction_tree().unwrap().cliques().all(|(_, c)| !c.contains(&5)));
    assert!(!it.elimination_order().unwrap().contains(&5));
    assert!(!it.created_junction_tree_cliques().unwrap().contains_key(&5));
    assert_eq!(it.created_junction_tree_clique(5).unwrap_err(), TriangulationError::NodeNotFound(5));
    assert_valid(&mut it);
}

#[test]
fn mutators_ignore_invalid_input() {
    let mut it = four_cycle();
    it.update_triangulation().unwrap();
    let snapshot = it.clone();

    it.add_node(1, 7);
    it.add_edge(1, 1);
    it.add_edge(1, 42);
    it.add_edge(2, 1);
    it.erase_edge(Edge::new(1, 3));
    it.erase_node(42);

    assert_eq!(it.graph(), snapshot.graph());
    assert_eq!(it.weights(), snapshot.weights());
    assert!(!it.is_update_required());
    assert_eq!(it.stats(), snapshot.stats());
}

#[test]
fn update_twice_is_a_noop() {
    let mut it = four_cycle();
    it.add_node(5, 2);
    it.add_edge(5, 3);
    it.update_triangulation().unwrap();

    let jt = it.junction_tree().unwrap().clone();
    let mpt = it.max_prime_junction_tree().unwrap().clone();
    it.update_triangulation().unwrap();
    assert_eq!(it.junction_tree().unwrap(), &jt);
    assert_eq!(it.max_prime_junction_tree().unwrap(), &mpt);
}

#[test]
fn set_graph_matches_incremental_construction() {
    let graph = UndiGraph::from_parts(1..=6, [(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 1), (2, 5)]);
    let weights: NodeWeights = graph.nodes().map(|n| (n, 2)).collect();

    let mut it = IncrementalTriangulation::from_graph(&DefaultTriangulation::default(), &graph, &weights).unwrap();
    assert_eq!(it.graph(), &graph);
    assert_valid(&mut it);

    // Replacing the graph forgets everything about the previous one.
    let small = UndiGraph::from_parts([7, 8], [(7, 8)]);
    it.set_graph(&small, &NodeWeights::from([(7, 2), (8, 2)])).unwrap();
    assert_eq!(it.stats(), &UpdateStats { direct_joins: 1, ..UpdateStats::default() });
    assert_eq!(labels(it.junction_tree().unwrap()), vec![NodeSet::from([7, 8])]);
    assert_valid(&mut it);
}

#[test]
fn clear_resets_everything() {
    let mut it = four_cycle();
    it.update_triangulation().unwrap();
    assert!(it.stats().updates > 0);
    it.clear();
    assert_eq!(it.stats(), &UpdateStats::default());
    assert!(it.graph().is_empty());
    assert!(it.junction_tree().unwrap().is_empty());
    assert!(it.max_prime_junction_tree().unwrap().is_empty());
    assert!(it.elimination_order().unwrap().is_empty());
    assert_valid(&mut it);
}

#[test]
fn clone_is_independent() {
    let mut it = four_cycle();
    let mut copy = it.clone();
    copy.erase_node(1);
    assert_valid(&mut copy);
    assert_eq!(it.junction_tree().unwrap().size(), 2);
    assert!(it.graph().exists_node(1));
}

#[test]
fn disconnected_components_form_a_forest() {
    let mut it = with_nodes(1..=6);
    it.add_edge(1, 2);
    it.add_edge(3, 4);
    it.add_edge(5, 6);
    let jt = it.junction_tree().unwrap().clone();
    assert_eq!(jt.size(), 3);
    assert_eq!(jt.size_edges(), 0);
    assert_valid(&mut it);

    // Linking two components goes through the direct join.
    let joins = it.stats().direct_joins;
    it.add_edge(2, 3);
    assert_eq!(it.stats().direct_joins, joins + 1);
    assert!(!it.is_update_required());
    assert_valid(&mut it);
}

#[test]
fn other_heuristics_give_valid_trees() {
    for heuristic in [EliminationHeuristic::MinFill, EliminationHeuristic::MinNeighbours] {
        let base = DefaultTriangulation::with_config(TriangulationConfig {
            heuristic,
            simplicial_first: true,
        });
        let mut it = IncrementalTriangulation::new(&base);
        for node in 1..=5 {
            it.add_node(node, node as u64 + 1);
        }
        for (x, y) in [(1, 2), (2, 3), (3, 4), (4, 5), (5, 1), (1, 3)] {
            it.add_edge(x, y);
        }
        assert_valid(&mut it);
    }
}

#[test]
fn incremental_engine_as_batch_triangulation() {
    let inner = IncrementalTriangulation::default();
    let mut it = IncrementalTriangulation::new(&inner);
    for node in 1..=5 {
        it.add_node(node, 2);
    }
    for (x, y) in [(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)] {
        it.add_edge(x, y);
    }
    assert_valid(&mut it);
    it.erase_edge(Edge::new(3, 4));
    assert_valid(&mut it);
}

#[test]
fn incremental_engine_implements_triangulation() {
    let graph = UndiGraph::from_parts([1, 2, 3, 4], [(1, 2), (2, 3), (3, 4), (4, 1)]);
    let weights: NodeWeights = graph.nodes().map(|n| (n, 2)).collect();

    let mut t: Box<dyn Triangulation> = IncrementalTriangulation::default().new_factory();
    t.set_graph(&graph, &weights).unwrap();
    assert_eq!(t.junction_tree().unwrap().size(), 2);
    assert_eq!(t.fill_ins().unwrap().len(), 1);
    let triangulated = t.triangulated_graph().unwrap();
    assert_eq!(triangulated.size_edges(), 5);

    let copy = t.clone();
    t.clear();
    assert_eq!(t.elimination_order().unwrap().len(), 0);
    let mut copy = copy;
    assert_eq!(copy.elimination_order().unwrap().len(), 4);
}

#[test]
fn queries_on_missing_nodes_fail() {
    let mut it = four_cycle();
    assert_eq!(it.elimination_order_of(9).unwrap_err(), TriangulationError::NodeNotFound(9));
    assert_eq!(it.created_junction_tree_clique(9).unwrap_err(), TriangulationError::NodeNotFound(9));
    assert_eq!(it.created_max_prime_subgraph(9).unwrap_err(), TriangulationError::NodeNotFound(9));
}

#[test]
fn large_weights_do_not_overflow() {
    let mut it = IncrementalTriangulation::default();
    for node in 0..12 {
        it.add_node(node, u64::MAX);
    }
    for x in 0..12 {
        for y in x + 1..12 {
            it.add_edge(x, y);
        }
    }
    let total = it.total_clique_weight().unwrap();
    assert!(total >= BigUint::from(u64::MAX).pow(12));
    assert_eq!(it.summary().unwrap().max_clique_size, 12);
    assert_valid(&mut it);
}
