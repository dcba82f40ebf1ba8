//! The triangulation strategy interface.
//!
//! A [`Triangulation`] takes an undirected graph plus per-node weights and
//! produces a junction tree together with the elimination ordering that realizes
//! it. Implementations are stateful objects: a graph is assigned with
//! [`set_graph`][Triangulation::set_graph] and the results are computed lazily
//! on the first query.
//!
//! [`IncrementalTriangulation`][crate::incremental::IncrementalTriangulation] owns
//! one boxed `Triangulation` which it invokes on the affected parts of its graph
//! only; it also implements the trait itself, so both can be used wherever a
//! triangulation is expected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::clique_graph::CliqueGraph;
use crate::error::Result;
use crate::graph::UndiGraph;
use crate::types::{CliqueId, Edge, NodeId, NodeWeights};

pub trait Triangulation: Debug {
    /// Creates a fresh instance with the same configuration and no graph.
    fn new_factory(&self) -> Box<dyn Triangulation>;

    /// Creates a deep copy of this instance, including the assigned graph.
    fn copy_factory(&self) -> Box<dyn Triangulation>;

    /// Forgets the assigned graph and every computed result.
    fn clear(&mut self);

    /// Assigns the graph to triangulate.
    ///
    /// Fails with [`MissingWeight`][crate::error::TriangulationError::MissingWeight]
    /// if some node of `graph` has no entry in `weights`.
    fn set_graph(&mut self, graph: &UndiGraph, weights: &NodeWeights) -> Result<()>;

    /// The junction tree of the assigned graph.
    fn junction_tree(&mut self) -> Result<&CliqueGraph>;

    /// The elimination ordering realizing the junction tree.
    fn elimination_order(&mut self) -> Result<&[NodeId]>;

    /// The rank of `node` in the elimination ordering.
    fn elimination_order_of(&mut self, node: NodeId) -> Result<usize>;

    /// For every node, the junction tree clique created when it was eliminated.
    fn created_junction_tree_cliques(&mut self) -> Result<&BTreeMap<NodeId, CliqueId>>;

    /// The junction tree clique created when `node` was eliminated.
    fn created_junction_tree_clique(&mut self, node: NodeId) -> Result<CliqueId>;

    /// The assigned graph plus every fill edge.
    fn triangulated_graph(&mut self) -> Result<&UndiGraph>;

    /// The edges added to the assigned graph to make it chordal.
    fn fill_ins(&mut self) -> Result<&BTreeSet<Edge>>;
}

impl Clone for Box<dyn Triangulation> {
    fn clone(&self) -> Self {
        self.copy_factory()
    }
}
