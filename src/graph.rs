//! Undirected graphs with caller-chosen node identifiers.
//!
//! [`UndiGraph`] is the graph being triangulated. Adjacency is kept in ordered
//! maps so that iteration (and therefore every triangulation built from the
//! graph) is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Unbounded};

use crate::types::{Edge, NodeId, NodeSet};

/// An undirected simple graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndiGraph {
    /// Adjacency sets, one per node.
    adj: BTreeMap<NodeId, NodeSet>,
    /// Number of edges.
    num_edges: usize,
}

impl UndiGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with the given nodes and edges.
    ///
    /// Edges referring to nodes that are not listed are ignored.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Self {
        let mut g = Self::new();
        for node in nodes {
            g.add_node(node);
        }
        for (a, b) in edges {
            g.add_edge(a, b);
        }
        g
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.adj.len()
    }

    /// Number of edges.
    pub fn size_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Adds a node. Returns `false` if it already existed.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.adj.contains_key(&node) {
            return false;
        }
        self.adj.insert(node, NodeSet::new());
        true
    }

    /// Removes a node together with its incident edges. Returns `false` if it did not exist.
    pub fn erase_node(&mut self, node: NodeId) -> bool {
        let Some(neighbours) = self.adj.remove(&node) else {
            return false;
        };
        for other in neighbours {
            if let Some(adj) = self.adj.get_mut(&other) {
                adj.remove(&node);
            }
            self.num_edges -= 1;
        }
        true
    }

    pub fn exists_node(&self, node: NodeId) -> bool {
        self.adj.contains_key(&node)
    }

    /// Adds the edge `a -- b`.
    ///
    /// Returns `false` (and does nothing) if `a == b`, if either node is missing,
    /// or if the edge already exists.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
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
    pub fn erase_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if !self.adj.get_mut(&a).is_some_and(|adj| adj.remove(&b)) {
            return false;
        }
        if let Some(adj) = self.adj.get_mut(&b) {
            adj.remove(&a);
        }
        self.num_edges -= 1;
        true
    }

    pub fn exists_edge(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.adj.get(&a).is_some_and(|adj| adj.contains(&b))
    }

    /// Neighbours of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn neighbours(&self, node: NodeId) -> &NodeSet {
        self.adj
            .get(&node)
            .unwrap_or_else(|| panic!("Node {} does not exist", node))
    }

    /// Iterates over the nodes in increasing order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adj.keys().copied()
    }

    /// Iterates over the edges, each reported once.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adj.iter().flat_map(|(&a, adj)| {
            adj.range((Excluded(a), Unbounded)).map(move |&b| Edge::new(a, b))
        })
    }

    pub fn clear(&mut self) {
        self.adj.clear();
        self.num_edges = 0;
    }

    /// Returns the subgraph induced by `nodes` (missing nodes are skipped).
    pub fn induced_subgraph<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeId>) -> UndiGraph {
        let keep: NodeSet = nodes.into_iter().copied().filter(|&n| self.exists_node(n)).collect();
        let mut sub = UndiGraph::new();
        for &node in &keep {
            sub.add_node(node);
        }
        for &node in &keep {
            for &other in self.adj[&node].range((Excluded(node), Unbounded)) {
                if keep.contains(&other) {
                    sub.add_edge(node, other);
                }
            }
        }
        sub
    }

    /// Partitions the nodes into connected components.
    pub fn connected_components(&self) -> Vec<NodeSet> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.nodes() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = NodeSet::from([start]);
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                for &other in &self.adj[&node] {
                    if seen.insert(other) {
                        component.insert(other);
                        stack.push(other);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Checks whether every pair of distinct nodes in `nodes` is adjacent.
    pub fn is_complete<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeId>) -> bool {
        let nodes: Vec<NodeId> = nodes.into_iter().copied().collect();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in &nodes[i + 1..] {
                if !self.exists_edge(a, b) {
                    return false;
                }
            }
        }
        true
    }
}
