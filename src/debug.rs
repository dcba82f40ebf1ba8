//! Debug utilities for inspecting incremental triangulations.
//!
//! [`IncrementalTriangulation::check`] verifies every structural invariant of
//! the engine and reports the first violation found. It is meant for tests and
//! for development: it walks every clique and is far slower than any edit.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::Write;

use log::debug;
use num_bigint::BigUint;

use crate::clique_graph::CliqueGraph;
use crate::error::{Inconsistency, Result, Structure};
use crate::graph::UndiGraph;
use crate::incremental::IncrementalTriangulation;
use crate::types::{CliqueId, NodeId, NodeSet};
use crate::utils::{max_clique_size, total_weight};

/// Size figures of an up-to-date triangulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangulationSummary {
    /// Number of graph nodes
    pub nodes: usize,
    /// Number of graph edges
    pub edges: usize,
    /// Number of junction tree cliques
    pub cliques: usize,
    /// Number of maximal prime subgraphs
    pub max_prime_subgraphs: usize,
    /// Size of the largest clique
    pub max_clique_size: usize,
    /// Sum of the clique state-space sizes
    pub total_weight: BigUint,
}

impl fmt::Display for TriangulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes={}, edges={}, cliques={}, mps={}, max_clique={}, weight={}",
            self.nodes, self.edges, self.cliques, self.max_prime_subgraphs, self.max_clique_size, self.total_weight
        )
    }
}

/// Checks that `tree` is a join tree covering exactly the nodes and edges of `graph`.
fn check_cover(graph: &UndiGraph, tree: &CliqueGraph, structure: Structure) -> std::result::Result<(), Inconsistency> {
    let mut covered = BTreeSet::new();
    for (_, clique) in tree.cliques() {
        for &node in clique {
            if !graph.exists_node(node) {
                return Err(Inconsistency::UnknownNode { node, structure });
            }
            covered.insert(node);
        }
    }
    if let Some(node) = graph.nodes().find(|n| !covered.contains(n)) {
        return Err(Inconsistency::UncoveredNode { node, structure });
    }
    for edge in graph.edges() {
        let (a, b) = (edge.first(), edge.second());
        if !tree.cliques().any(|(_, c)| c.contains(&a) && c.contains(&b)) {
            return Err(Inconsistency::UncoveredEdge { edge, structure });
        }
    }
    if !tree.is_forest() {
        return Err(Inconsistency::NotAForest { structure });
    }
    if let Some(node) = tree.running_intersection_violation() {
        return Err(Inconsistency::RunningIntersection { node, structure });
    }
    Ok(())
}

impl IncrementalTriangulation {
    /// Brings the triangulation up to date and verifies its invariants:
    ///
    /// - both trees are forests covering every node and edge of the graph,
    ///   with the running intersection property,
    /// - the node, clique and MPS indices agree with the trees,
    /// - every MPS is the union of its cliques and none is left affected,
    /// - separators between max prime subgraphs are complete in the graph,
    /// - the elimination order is a perfect elimination ordering of the
    ///   triangulated graph, and every node belongs to its created clique.
    pub fn check(&mut self) -> Result<()> {
        self.update_triangulation()?;
        debug!("check(): {}", self.summary()?);

        check_cover(&self.graph, &self.junction_tree, Structure::JunctionTree)?;
        check_cover(&self.graph, &self.max_prime_tree, Structure::MaxPrimeSubgraphTree)?;

        // Node -> MPS index.
        let mut expected: BTreeMap<NodeId, BTreeSet<CliqueId>> = BTreeMap::new();
        for (mps, label) in self.max_prime_tree.cliques() {
            for &node in label {
                expected.entry(node).or_default().insert(mps);
            }
        }
        for node in self.graph.nodes() {
            let recorded = self.mps_of_node.get(&node).map(Vec::as_slice).unwrap_or_default();
            let unique: BTreeSet<CliqueId> = recorded.iter().copied().collect();
            if unique.len() != recorded.len() || expected.get(&node) != Some(&unique) {
                return Err(Inconsistency::MpsOfNode { node }.into());
            }
        }
        if let Some(&node) = self.mps_of_node.keys().find(|n| !self.graph.exists_node(**n)) {
            return Err(Inconsistency::MpsOfNode { node }.into());
        }

        // Clique -> MPS index.
        for clique in self.junction_tree.nodes() {
            let owned = self.mps_of_clique.get(&clique).is_some_and(|mps| {
                self.cliques_of_mps.get(mps).is_some_and(|cliques| cliques.contains(&clique))
            });
            if !owned {
                return Err(Inconsistency::MpsOfClique { clique }.into());
            }
        }
        if let Some(&clique) = self.mps_of_clique.keys().find(|c| !self.junction_tree.exists_node(**c)) {
            return Err(Inconsistency::MpsOfClique { clique }.into());
        }

        // MPS -> cliques index.
        for (mps, label) in self.max_prime_tree.cliques() {
            let Some(cliques) = self.cliques_of_mps.get(&mps) else {
                return Err(Inconsistency::MpsLabel { mps }.into());
            };
            let mut union = NodeSet::new();
            for &clique in cliques {
                if self.mps_of_clique.get(&clique) != Some(&mps) {
                    return Err(Inconsistency::MpsOfClique { clique }.into());
                }
                union.extend(self.junction_tree.clique(clique));
            }
            if &union != label {
                return Err(Inconsistency::MpsLabel { mps }.into());
            }
            if self.mps_affected.get(&mps) != Some(&false) {
                return Err(Inconsistency::PendingUpdate { mps }.into());
            }
        }
        if self.cliques_of_mps.len() != self.max_prime_tree.size() {
            let mps = self
                .cliques_of_mps
                .keys()
                .copied()
                .find(|&m| !self.max_prime_tree.exists_node(m))
                .unwrap_or_default();
            return Err(Inconsistency::MpsLabel { mps }.into());
        }

        // Separators between max prime subgraphs are complete.
        for (a, b) in self.max_prime_tree.edges() {
            if !self.graph.is_complete(&self.max_prime_tree.separator(a, b)) {
                return Err(Inconsistency::IncompleteSeparator { a, b }.into());
            }
        }

        // Elimination order.
        let order = self.elimination_order()?.to_vec();
        let nodes: BTreeSet<NodeId> = order.iter().copied().collect();
        if order.len() != self.graph.size() || nodes.iter().copied().ne(self.graph.nodes()) {
            return Err(Inconsistency::EliminationOrder.into());
        }
        for (i, &node) in order.iter().enumerate() {
            if self.elimination_order_of(node)? != i {
                return Err(Inconsistency::EliminationOrder.into());
            }
        }
        let rank: BTreeMap<NodeId, usize> = order.iter().enumerate().map(|(i, &node)| (node, i)).collect();
        let (filled, _) = self.compute_filled_graph()?;
        for (i, &node) in order.iter().enumerate() {
            let later: Vec<NodeId> = filled.neighbours(node).iter().copied().filter(|n| rank[n] > i).collect();
            if !filled.is_complete(&later) {
                return Err(Inconsistency::NotPerfectElimination { node }.into());
            }
        }

        // Created cliques.
        let created = self.created_junction_tree_cliques()?.clone();
        for node in self.graph.nodes() {
            let contains = created
                .get(&node)
                .and_then(|&c| self.junction_tree.get(c))
                .is_some_and(|clique| clique.contains(&node));
            if !contains {
                return Err(Inconsistency::CreatedClique { node }.into());
            }
        }

        Ok(())
    }

    /// Size figures of the up-to-date triangulation.
    pub fn summary(&mut self) -> Result<TriangulationSummary> {
        self.update_triangulation()?;
        Ok(TriangulationSummary {
            nodes: self.graph.size(),
            edges: self.graph.size_edges(),
            cliques: self.junction_tree.size(),
            max_prime_subgraphs: self.max_prime_tree.size(),
            max_clique_size: max_clique_size(&self.junction_tree),
            total_weight: total_weight(&self.junction_tree, &self.weights),
        })
    }

    /// Dump the complete state for debugging.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();

        writeln!(&mut result, "=== Triangulation State ===").unwrap();
        writeln!(
            &mut result,
            "Graph: nodes={}, edges={}, pending update: {}",
            self.graph.size(),
            self.graph.size_edges(),
            self.require_update
        )
        .unwrap();

        writeln!(&mut result, "Junction tree:").unwrap();
        for (id, clique) in self.junction_tree.cliques() {
            let mps = self.mps_of_clique.get(&id).map_or("?".to_string(), |m| m.to_string());
            let neighbours: Vec<CliqueId> = self.junction_tree.neighbours(id).iter().copied().collect();
            writeln!(&mut result, "  C{} {:?} (mps={}) -> {:?}", id, clique, mps, neighbours).unwrap();
        }

        writeln!(&mut result, "Max prime subgraphs:").unwrap();
        for (id, label) in self.max_prime_tree.cliques() {
            let affected = self.mps_affected.get(&id).copied().unwrap_or(false);
            let neighbours: Vec<CliqueId> = self.max_prime_tree.neighbours(id).iter().copied().collect();
            writeln!(
                &mut result,
                "  M{} {:?}{} cliques={:?} -> {:?}",
                id,
                label,
                if affected { " (affected)" } else { "" },
                self.cliques_of_mps.get(&id).map(Vec::as_slice).unwrap_or_default(),
                neighbours
            )
            .unwrap();
        }

        result
    }
}
