//! The stock batch triangulation.
//!
//! [`DefaultTriangulation`] eliminates the nodes of its graph greedily (see
//! [`elimination`][crate::elimination]) and assembles the junction tree directly
//! from the elimination cliques:
//!
//! 1. For every node `v`, let `parent(v)` be the first node of `C_v \ {v}` to be
//!    eliminated after `v` (where `C_v` is the elimination clique of `v`).
//! 2. `C_v` is not maximal iff some `u` with `parent(u) = v` has `|C_u| = |C_v| + 1`;
//!    in that case `C_v ⊆ C_u` and `v` shares the junction tree clique of `u`.
//!    Otherwise `C_v` becomes a new clique.
//! 3. Every node `u` with a parent links the clique of `u` to the clique of
//!    `parent(u)` when the two differ.
//!
//! The result is a forest of maximal cliques with the running intersection
//! property, one tree per connected component. The clique assigned to `v` is
//! its *created* clique and always contains `C_v`.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::clique_graph::CliqueGraph;
use crate::elimination::{eliminate, TriangulationConfig};
use crate::error::{Result, TriangulationError};
use crate::graph::UndiGraph;
use crate::triangulation::Triangulation;
use crate::types::{CliqueId, Edge, NodeId, NodeWeights};

/// Greedy elimination triangulation.
#[derive(Debug, Clone, Default)]
pub struct DefaultTriangulation {
    config: TriangulationConfig,
    graph: Option<UndiGraph>,
    weights: NodeWeights,
    result: Option<Computed>,
}

#[derive(Debug, Clone)]
struct Computed {
    order: Vec<NodeId>,
    reverse_order: BTreeMap<NodeId, usize>,
    fill_ins: BTreeSet<Edge>,
    triangulated: UndiGraph,
    junction_tree: CliqueGraph,
    created: BTreeMap<NodeId, CliqueId>,
}

impl Computed {
    fn build(graph: &UndiGraph, weights: &NodeWeights, config: &TriangulationConfig) -> Self {
        debug!(
            "triangulate(nodes = {}, edges = {}, heuristic = {:?})",
            graph.size(),
            graph.size_edges(),
            config.heuristic
        );

        let elimination = eliminate(graph, weights, config);
        let order = elimination.order;
        let cliques = elimination.cliques;
        let n = order.len();

        let reverse_order: BTreeMap<NodeId, usize> = order.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let parent: Vec<Option<usize>> = (0..n)
            .map(|i| {
                cliques[i]
                    .iter()
                    .filter(|&&u| u != order[i])
                    .map(|u| reverse_order[u])
                    .min()
            })
            .collect();

        let mut absorber: Vec<Option<usize>> = vec![None; n];
        for (j, p) in parent.iter().enumerate() {
            if let &Some(p) = p {
                if absorber[p].is_none() && cliques[j].len() == cliques[p].len() + 1 {
                    absorber[p] = Some(j);
                }
            }
        }

        let mut junction_tree = CliqueGraph::new();
        let mut clique_of: Vec<CliqueId> = Vec::with_capacity(n);
        for i in 0..n {
            let id = match absorber[i] {
                Some(j) => clique_of[j],
                None => junction_tree.add_node(cliques[i].clone()),
            };
            clique_of.push(id);
        }
        for (i, p) in parent.iter().enumerate() {
            if let &Some(p) = p {
                if clique_of[i] != clique_of[p] {
                    junction_tree.add_edge(clique_of[i], clique_of[p]);
                }
            }
        }

        let created = order.iter().zip(&clique_of).map(|(&v, &c)| (v, c)).collect();

        let mut triangulated = graph.clone();
        for edge in &elimination.fill_ins {
            triangulated.add_edge(edge.first(), edge.second());
        }

        debug!(
            "triangulate: {} cliques, {} fill edges",
            junction_tree.size(),
            elimination.fill_ins.len()
        );

        Self {
            order,
            reverse_order,
            fill_ins: elimination.fill_ins,
            triangulated,
            junction_tree,
            created,
        }
    }
}

impl DefaultTriangulation {
    /// Creates a triangulation with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a triangulation driven by `config`.
    pub fn with_config(config: TriangulationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The elimination configuration.
    pub fn config(&self) -> &TriangulationConfig {
        &self.config
    }

    /// The assigned graph, if any.
    pub fn graph(&self) -> Option<&UndiGraph> {
        self.graph.as_ref()
    }

    fn compute(&mut self) -> Result<&Computed> {
        if self.result.is_none() {
            let graph = self.graph.as_ref().ok_or(TriangulationError::NoGraph)?;
            self.result = Some(Computed::build(graph, &self.weights, &self.config));
        }
        self.result.as_ref().ok_or(TriangulationError::NoGraph)
    }
}

impl Triangulation for DefaultTriangulation {
    fn new_factory(&self) -> Box<dyn Triangulation> {
        Box::new(DefaultTriangulation::with_config(self.config.clone()))
    }

    fn copy_factory(&self) -> Box<dyn Triangulation> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.graph = None;
        self.weights.clear();
        self.result = None;
    }

    fn set_graph(&mut self, graph: &UndiGraph, weights: &NodeWeights) -> Result<()> {
        let mut own_weights = NodeWeights::new();
        for node in graph.nodes() {
            let &w = weights.get(&node).ok_or(TriangulationError::MissingWeight(node))?;
            own_weights.insert(node, w);
        }
        self.graph = Some(graph.clone());
        self.weights = own_weights;
        self.result = None;
        Ok(())
    }

    fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        Ok(&self.compute()?.junction_tree)
    }

    fn elimination_order(&mut self) -> Result<&[NodeId]> {
        Ok(&self.compute()?.order)
    }

    fn elimination_order_of(&mut self, node: NodeId) -> Result<usize> {
        let computed = self.compute()?;
        computed
            .reverse_order
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    fn created_junction_tree_cliques(&mut self) -> Result<&BTreeMap<NodeId, CliqueId>> {
        Ok(&self.compute()?.created)
    }

    fn created_junction_tree_clique(&mut self, node: NodeId) -> Result<CliqueId> {
        let computed = self.compute()?;
        computed
            .created
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    fn triangulated_graph(&mut self) -> Result<&UndiGraph> {
        Ok(&self.compute()?.triangulated)
    }

    fn fill_ins(&mut self) -> Result<&BTreeSet<Edge>> {
        Ok(&self.compute()?.fill_ins)
    }
}
