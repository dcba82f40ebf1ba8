//! Clique graphs: graphs whose nodes are labelled with sets of graph nodes.
//!
//! Both the junction tree and the maximal prime subgraph tree maintained by
//! [`IncrementalTriangulation`][crate::incremental::IncrementalTriangulation] are
//! clique graphs. The separator of an edge is the intersection of the labels of
//! its endpoints.
//!
//! # Running intersection property
//!
//! A clique graph has the *running intersection property* when, for every graph
//! node `x`, the cliques containing `x` induce a connected subgraph. An acyclic
//! clique graph with that property is a *join tree* (a forest, in general: distinct
//! trees are never linked through empty separators).
//!
//! Clique ids are allocated monotonically and never reused, so an id that has been
//! erased stays invalid for the lifetime of the graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{CliqueId, NodeId, NodeSet};

/// A graph of cliques.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliqueGraph {
    cliques: BTreeMap<CliqueId, NodeSet>,
    adj: BTreeMap<CliqueId, BTreeSet<CliqueId>>,
    num_edges: usize,
    /// Next id handed out by `add_node`.
    next_id: CliqueId,
}

impl CliqueGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cliques.
    pub fn size(&self) -> usize {
        self.cliques.len()
    }

    /// Number of edges.
    pub fn size_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    /// Upper bound (exclusive) of the ids allocated so far.
    pub fn bound(&self) -> CliqueId {
        self.next_id
    }

    /// Adds a new clique labelled `clique` and returns its id.
    pub fn add_node(&mut self, clique: NodeSet) -> CliqueId {
        let id = self.next_id;
        self.next_id += 1;
        self.cliques.insert(id, clique);
        self.adj.insert(id, BTreeSet::new());
        id
    }

    /// Removes a clique together with its incident edges. Returns `false` if it did not exist.
    pub fn erase_node(&mut self, id: CliqueId) -> bool {
        if self.cliques.remove(&id).is_none() {
            return false;
        }
        if let Some(neighbours) = self.adj.remove(&id) {
            for other in neighbours {
                if let Some(adj) = self.adj.get_mut(&other) {
                    adj.remove(&id);
                }
                self.num_edges -= 1;
            }
        }
        true
    }

    pub fn exists_node(&self, id: CliqueId) -> bool {
        self.cliques.contains_key(&id)
    }

    /// The label of clique `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exist.
    pub fn clique(&self, id: CliqueId) -> &NodeSet {
        self.cliques
            .get(&id)
            .unwrap_or_else(|| panic!("Clique {} does not exist", id))
    }

    /// The label of clique `id`, if it exists.
    pub fn get(&self, id: CliqueId) -> Option<&NodeSet> {
        self.cliques.get(&id)
    }

    /// Adds `node` to the label of clique `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exist.
    pub fn add_to_clique(&mut self, id: CliqueId, node: NodeId) -> bool {
        self.cliques
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Clique {} does not exist", id))
            .insert(node)
    }

    /// Removes `node` from the label of clique `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exist.
    pub fn erase_from_clique(&mut self, id: CliqueId, node: NodeId) -> bool {
        self.cliques
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Clique {} does not exist", id))
            .remove(&node)
    }

    /// Adds the edge `a -- b`. Returns `false` if `a == b`, if either clique is
    /// missing or if the edge already exists.
    pub fn add_edge(&mut self, a: CliqueId, b: CliqueId) -> bool {
        if a == b || !self.exists_node(a) || !self.exists_node(b) {
            return false;
        }
        if !self.adj.get_mut(&a).is_some_and(|adj| adj.insert(b)) {
            return false;
        }
        if let Some(adj) = self.adj.get_mut(&b) {
            adj.insert(a);
        }
        self.num_edges += 1;
        true
    }

    /// Removes the edge `a -- b`. Returns `false` if it did not exist.
    pub fn erase_edge(&mut self, a: CliqueId, b: CliqueId) -> bool {
        if !self.adj.get_mut(&a).is_some_and(|adj| adj.remove(&b)) {
            return false;
        }
        if let Some(adj) = self.adj.get_mut(&b) {
            adj.remove(&a);
        }
        self.num_edges -= 1;
        true
    }

    pub fn exists_edge(&self, a: CliqueId, b: CliqueId) -> bool {
        self.adj.get(&a).is_some_and(|adj| adj.contains(&b))
    }

    /// Neighbours of clique `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exist.
    pub fn neighbours(&self, id: CliqueId) -> &BTreeSet<CliqueId> {
        self.adj
            .get(&id)
            .unwrap_or_else(|| panic!("Clique {} does not exist", id))
    }

    /// The separator between cliques `a` and `b` (the intersection of their labels).
    pub fn separator(&self, a: CliqueId, b: CliqueId) -> NodeSet {
        self.clique(a).intersection(self.clique(b)).copied().collect()
    }

    /// Iterates over the clique ids in increasing order.
    pub fn nodes(&self) -> impl Iterator<Item = CliqueId> + '_ {
        self.cliques.keys().copied()
    }

    /// Iterates over `(id, label)` pairs.
    pub fn cliques(&self) -> impl Iterator<Item = (CliqueId, &NodeSet)> + '_ {
        self.cliques.iter().map(|(&id, clique)| (id, clique))
    }

    /// Iterates over the edges as `(smaller id, larger id)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (CliqueId, CliqueId)> + '_ {
        self.adj
            .iter()
            .flat_map(|(&a, adj)| adj.range(a + 1..).map(move |&b| (a, b)))
    }

    /// Returns some clique containing `node`, if any.
    pub fn container_clique(&self, node: NodeId) -> Option<CliqueId> {
        self.cliques
            .iter()
            .find(|(_, clique)| clique.contains(&node))
            .map(|(&id, _)| id)
    }

    /// Removes every clique and edge. The id allocator is reset as well.
    pub fn clear(&mut self) {
        self.cliques.clear();
        self.adj.clear();
        self.num_edges = 0;
        self.next_id = 0;
    }

    /// Checks that the clique graph has no cycle.
    pub fn is_forest(&self) -> bool {
        let mut seen = BTreeSet::new();
        let mut components = 0;
        for start in self.nodes() {
            if !seen.insert(start) {
                continue;
            }
            components += 1;
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                for &other in &self.adj[&id] {
                    if seen.insert(other) {
                        stack.push(other);
                    }
                }
            }
        }
        self.num_edges + components == self.size()
    }

    /// Returns the first graph node whose containing cliques are not connected,
    /// or `None` if the running intersection property holds.
    pub fn running_intersection_violation(&self) -> Option<NodeId> {
        let mut containers: BTreeMap<NodeId, Vec<CliqueId>> = BTreeMap::new();
        for (&id, clique) in &self.cliques {
            for &node in clique {
                containers.entry(node).or_default().push(id);
            }
        }

        for (node, ids) in containers {
            let mut reached = BTreeSet::from([ids[0]]);
            let mut stack = vec![ids[0]];
            while let Some(id) = stack.pop() {
                for &other in &self.adj[&id] {
                    if self.cliques[&other].contains(&node) && reached.insert(other) {
                        stack.push(other);
                    }
                }
            }
            if reached.len() != ids.len() {
                return Some(node);
            }
        }
        None
    }

    pub fn has_running_intersection(&self) -> bool {
        self.running_intersection_violation().is_none()
    }

    /// Checks that the clique graph is a join tree (a forest with the running
    /// intersection property).
    pub fn is_join_tree(&self) -> bool {
        self.is_forest() && self.has_running_intersection()
    }
}
