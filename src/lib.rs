//! # jtree-rs: Incremental Junction Tree Triangulation
//!
//! **`jtree-rs`** maintains a triangulation of an undirected graph while the graph is
//! edited one node or edge at a time. It is designed for probabilistic graphical models,
//! where a structure learning search keeps proposing, scoring and reverting small edits,
//! and the cost of inference depends on the junction tree of the current structure.
//!
//! ## What is a Junction Tree?
//!
//! Triangulating a graph means adding *fill edges* until every cycle of length four or more
//! has a chord. The maximal cliques of the triangulated graph can then be arranged as a tree
//! (a **junction tree**) in which, for every graph node, the cliques containing it form a
//! connected subtree (the **running intersection property**).
//!
//! Merging adjacent cliques whose separator is not complete in the original graph yields the
//! **maximal prime subgraph tree**. Its separators are complete, so an edit can only
//! invalidate the prime subgraphs it touches: the rest of the tree is kept as is.
//!
//! ## Key Features
//!
//! - **Incremental**: [`IncrementalTriangulation`][crate::incremental::IncrementalTriangulation]
//!   re-triangulates only the affected prime subgraphs.
//! - **Lazy**: Edits are cheap. Work is deferred until the junction tree, the elimination order
//!   or the created cliques are queried.
//! - **Pluggable**: The local re-triangulation is delegated to any
//!   [`Triangulation`][crate::triangulation::Triangulation]; the stock
//!   [`DefaultTriangulation`][crate::default_triangulation::DefaultTriangulation] uses greedy
//!   elimination with configurable heuristics.
//! - **Checkable**: [`check`][crate::incremental::IncrementalTriangulation::check] verifies every
//!   structural invariant, which makes the engine easy to fuzz.
//!
//! ## Basic Usage
//!
//! ```rust
//! use jtree_rs::incremental::IncrementalTriangulation;
//! use jtree_rs::types::Edge;
//!
//! // 1. Create an engine backed by the default triangulation
//! let mut it = IncrementalTriangulation::default();
//!
//! // 2. Add nodes with their domain sizes, then edges: a 4-cycle
//! for node in 1..=4 {
//!     it.add_node(node, 2);
//! }
//! for (x, y) in [(1, 2), (2, 3), (3, 4), (4, 1)] {
//!     it.add_edge(x, y);
//! }
//!
//! // 3. Query: the cycle needs one chord, giving two triangles
//! assert_eq!(it.junction_tree().unwrap().size(), 2);
//!
//! // 4. Break the cycle: only the affected region is re-triangulated
//! it.erase_edge(Edge::new(4, 1));
//! assert_eq!(it.junction_tree().unwrap().size(), 3);
//! it.check().unwrap();
//! ```
//!
//! ## Core Components
//!
//! - **[`incremental`]**: The engine. Start here.
//! - **[`triangulation`]**: The batch triangulation interface.
//! - **[`default_triangulation`]** and **[`elimination`]**: Greedy elimination.
//! - **[`graph`]** and **[`clique_graph`]**: The graph containers.
//! - **[`dot`]**: Utilities for visualizing graphs and junction trees using Graphviz.
//! - **[`debug`]**: Consistency checks and state dumps.

pub mod clique_graph;
pub mod debug;
pub mod default_triangulation;
pub mod dot;
pub mod elimination;
pub mod error;
pub mod graph;
pub mod incremental;
pub mod triangulation;
pub mod types;
pub mod utils;
