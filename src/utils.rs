use num_bigint::BigUint;

use crate::clique_graph::CliqueGraph;
use crate::types::{NodeSet, NodeWeights};

/// State-space size of a clique: the product of the weights of its nodes.
///
/// Nodes without a weight count as 1. The product easily overflows `u64` for
/// cliques of a few dozen nodes, hence the big integer.
///
/// ```text
/// {a, b, c} -> w(a) * w(b) * w(c)
/// ```
pub fn clique_weight(clique: &NodeSet, weights: &NodeWeights) -> BigUint {
    clique
        .iter()
        .map(|n| weights.get(n).copied().unwrap_or(1))
        .fold(BigUint::from(1u32), |acc, w| acc * w)
}

/// Sum of [`clique_weight`] over all cliques of `tree`.
pub fn total_weight(tree: &CliqueGraph, weights: &NodeWeights) -> BigUint {
    tree.cliques()
        .map(|(_, clique)| clique_weight(clique, weights))
        .fold(BigUint::ZERO, |acc, w| acc + w)
}

/// Largest clique of `tree`, in number of nodes.
pub fn max_clique_size(tree: &CliqueGraph) -> usize {
    tree.cliques().map(|(_, c)| c.len()).max().unwrap_or(0)
}
