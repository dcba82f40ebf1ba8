//! Greedy node elimination.
//!
//! # Theory: Elimination and Triangulation
//!
//! Eliminating a node `v` from a graph means connecting all of its remaining
//! neighbours pairwise (adding *fill edges*) and then removing `v`. The set
//! `{v} ∪ neighbours(v)` at elimination time is the *elimination clique* of `v`.
//! The original graph plus every fill edge is chordal, and the maximal
//! elimination cliques are exactly its maximal cliques.
//!
//! Finding the ordering that minimizes the total clique size is NP-hard, so the
//! ordering is built greedily: at every step the remaining node with the lowest
//! score according to an [`EliminationHeuristic`] is eliminated. A *simplicial*
//! node (whose neighbourhood is already complete) can be eliminated without any
//! fill-in, and is always a safe choice.
//!
//! # References
//!
//! - U. Kjærulff. "Triangulation of graphs: algorithms giving small total state space."
//!   Technical report R-90-09, Aalborg University, 1990.
//! - D. Rose, R. Tarjan, G. Lueker. "Algorithmic aspects of vertex elimination on graphs."
//!   SIAM J. Computing, 1976.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::graph::UndiGraph;
use crate::types::{Edge, NodeId, NodeSet, NodeWeights};

/// Score used to pick the next node to eliminate. Lower is better.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum EliminationHeuristic {
    /// Product of the weights of the node and its remaining neighbours,
    /// i.e. the state-space size of the elimination clique.
    #[default]
    MinWeight,
    /// Number of fill edges the elimination would add.
    MinFill,
    /// Number of remaining neighbours.
    MinNeighbours,
}

/// Configuration of [`DefaultTriangulation`][crate::default_triangulation::DefaultTriangulation].
#[derive(Debug, Clone)]
pub struct TriangulationConfig {
    /// Heuristic used to choose the next node to eliminate (default: MinWeight)
    pub heuristic: EliminationHeuristic,
    /// Eliminate simplicial nodes before any other node (default: true)
    pub simplicial_first: bool,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            heuristic: EliminationHeuristic::MinWeight,
            simplicial_first: true,
        }
    }
}

/// Result of eliminating every node of a graph.
#[derive(Debug, Clone, Default)]
pub struct Elimination {
    /// Nodes in elimination order.
    pub order: Vec<NodeId>,
    /// Elimination clique of `order[i]`.
    pub cliques: Vec<NodeSet>,
    /// Edges added during elimination.
    pub fill_ins: BTreeSet<Edge>,
}

/// Eliminates all nodes of `graph` greedily.
///
/// Nodes without a weight count as weight 1. Ties are broken by the smallest node id.
pub fn eliminate(graph: &UndiGraph, weights: &NodeWeights, config: &TriangulationConfig) -> Elimination {
    let mut adj: BTreeMap<NodeId, NodeSet> = graph.nodes().map(|n| (n, graph.neighbours(n).clone())).collect();
    let log_weight = |n: NodeId| weights.get(&n).map_or(0.0, |&w| (w.max(1) as f64).log2());

    let mut result = Elimination {
        order: Vec::with_capacity(adj.len()),
        cliques: Vec::with_capacity(adj.len()),
        fill_ins: BTreeSet::new(),
    };

    while !adj.is_empty() {
        let mut best: Option<(bool, f64, NodeId)> = None;
        for (&node, neighbours) in &adj {
            let fill = missing_pairs(&adj, neighbours);
            let score = match config.heuristic {
                EliminationHeuristic::MinWeight => {
                    log_weight(node) + neighbours.iter().map(|&n| log_weight(n)).sum::<f64>()
                }
                EliminationHeuristic::MinFill => fill as f64,
                EliminationHeuristic::MinNeighbours => neighbours.len() as f64,
            };
            let not_simplicial = config.simplicial_first && fill > 0;
            let better = match best {
                None => true,
                Some((b_not_simplicial, b_score, _)) => (not_simplicial, score) < (b_not_simplicial, b_score),
            };
            if better {
                best = Some((not_simplicial, score, node));
            }
        }
        let Some((_, score, node)) = best else {
            break;
        };

        let neighbours = adj.remove(&node).unwrap_or_default();
        trace!("eliminate {} (score = {:.3}, neighbours = {:?})", node, score, neighbours);

        let ns: Vec<NodeId> = neighbours.iter().copied().collect();
        for (i, &a) in ns.iter().enumerate() {
            for &b in &ns[i + 1..] {
                let added = adj.get_mut(&a).is_some_and(|s| s.insert(b));
                if added {
                    if let Some(s) = adj.get_mut(&b) {
                        s.insert(a);
                    }
                    result.fill_ins.insert(Edge::new(a, b));
                }
            }
        }
        for &other in &ns {
            if let Some(s) = adj.get_mut(&other) {
                s.remove(&node);
            }
        }

        let mut clique = neighbours;
        clique.insert(node);
        result.order.push(node);
        result.cliques.push(clique);
    }

    result
}

/// Number of non-adjacent pairs in `nodes`.
fn missing_pairs(adj: &BTreeMap<NodeId, NodeSet>, nodes: &NodeSet) -> usize {
    let mut missing = 0;
    for (i, a) in nodes.iter().enumerate() {
        let adj_a = &adj[a];
        missing += nodes.iter().skip(i + 1).filter(|b| !adj_a.contains(b)).count();
    }
    missing
}
