//! Error types.

use std::fmt;

use thiserror::Error;

use crate::types::{CliqueId, Edge, NodeId};

/// Result type alias for triangulation operations.
pub type Result<T> = std::result::Result<T, TriangulationError>;

/// Errors reported by triangulations.
///
/// Mutators never fail: adding an existing node or erasing a missing edge is a no-op.
/// Queries about a node that is not in the graph fail with [`NodeNotFound`][Self::NodeNotFound].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    /// The node is not part of the graph.
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    /// A node of the assigned graph has no weight.
    #[error("No weight given for node {0}")]
    MissingWeight(NodeId),

    /// The triangulation was queried before any graph was assigned.
    #[error("No graph assigned to the triangulation")]
    NoGraph,

    /// The internal consistency check failed.
    #[error("Inconsistent triangulation: {0}")]
    Inconsistent(#[from] Inconsistency),
}

/// The tree a consistency violation was found in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Structure {
    JunctionTree,
    MaxPrimeSubgraphTree,
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::JunctionTree => write!(f, "junction tree"),
            Structure::MaxPrimeSubgraphTree => write!(f, "max prime subgraph tree"),
        }
    }
}

/// A violated invariant, as reported by
/// [`IncrementalTriangulation::check`][crate::incremental::IncrementalTriangulation::check].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    #[error("node {node} is not covered by any clique of the {structure}")]
    UncoveredNode { node: NodeId, structure: Structure },

    #[error("edge {edge} is not covered by any clique of the {structure}")]
    UncoveredEdge { edge: Edge, structure: Structure },

    #[error("the {structure} contains node {node} which is not in the graph")]
    UnknownNode { node: NodeId, structure: Structure },

    #[error("the {structure} is not a forest")]
    NotAForest { structure: Structure },

    #[error("the {structure} violates the running intersection property on node {node}")]
    RunningIntersection { node: NodeId, structure: Structure },

    #[error("the max prime subgraphs recorded for node {node} do not match the tree")]
    MpsOfNode { node: NodeId },

    #[error("clique {clique} is not owned by a max prime subgraph consistently")]
    MpsOfClique { clique: CliqueId },

    #[error("max prime subgraph {mps} is not the union of its cliques")]
    MpsLabel { mps: CliqueId },

    #[error("max prime subgraph {mps} is still marked as affected")]
    PendingUpdate { mps: CliqueId },

    #[error("the separator between max prime subgraphs {a} and {b} is not complete in the graph")]
    IncompleteSeparator { a: CliqueId, b: CliqueId },

    #[error("the elimination order is not a permutation of the graph nodes")]
    EliminationOrder,

    #[error("the neighbours of node {node} eliminated after it are not pairwise adjacent")]
    NotPerfectElimination { node: NodeId },

    #[error("the created clique of node {node} is missing or does not contain it")]
    CreatedClique { node: NodeId },
}
