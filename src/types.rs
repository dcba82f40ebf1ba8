//! Identifier types shared by graphs, clique graphs and triangulations.
//!
//! Graph nodes are opaque `u32` identifiers chosen by the caller. Clique ids
//! are allocated by [`CliqueGraph`][crate::clique_graph::CliqueGraph] and are
//! only meaningful for the clique graph that produced them.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a node of the triangulated graph.
pub type NodeId = u32;

/// Identifier of a node (a clique) of a junction tree or a max prime subgraph tree.
pub type CliqueId = usize;

/// A set of graph nodes, e.g. the label of a clique or a separator.
pub type NodeSet = BTreeSet<NodeId>;

/// Per-node weights (domain sizes) used by triangulation heuristics.
///
/// # Invariants
///
/// - Every weight is positive.
pub type NodeWeights = BTreeMap<NodeId, u64>;

/// An undirected edge between two distinct nodes.
///
/// The endpoints are normalized on construction, so `Edge::new(2, 1) == Edge::new(1, 2)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Edge(NodeId, NodeId);

impl Edge {
    /// Creates a new edge between `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`. Self loops are not edges of an undirected graph.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        assert_ne!(a, b, "Self loops are not allowed: {} -- {}", a, b);
        if a < b {
            Edge(a, b)
        } else {
            Edge(b, a)
        }
    }

    /// Returns the smaller endpoint.
    pub fn first(self) -> NodeId {
        self.0
    }

    /// Returns the larger endpoint.
    pub fn second(self) -> NodeId {
        self.1
    }

    /// Returns the endpoint opposite to `node`, or `None` if `node` is not an endpoint.
    pub fn other(self, node: NodeId) -> Option<NodeId> {
        if node == self.0 {
            Some(self.1)
        } else if node == self.1 {
            Some(self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.0, self.1)
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((a, b): (NodeId, NodeId)) -> Self {
        Edge::new(a, b)
    }
}
