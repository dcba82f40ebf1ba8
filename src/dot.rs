//! Graph and junction tree to DOT (Graphviz) conversion.
//!
//! # DOT Format
//!
//! The generated output follows these conventions:
//! - **Graph nodes** are circles labelled with their id
//! - **Cliques** are boxes labelled with their id and node set, e.g. `C3: {1, 2, 4}`
//! - **Tree edges** are labelled with the separator of their endpoints
//! - **Fill edges**, when given, are dashed
//!
//! # Examples
//!
//! ```
//! use jtree_rs::incremental::IncrementalTriangulation;
//!
//! let mut it = IncrementalTriangulation::default();
//! it.add_node(1, 2);
//! it.add_node(2, 2);
//! it.add_edge(1, 2);
//!
//! let dot = it.junction_tree().unwrap().to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::clique_graph::CliqueGraph;
use crate::graph::UndiGraph;
use crate::types::{Edge, NodeSet};

/// Configuration options for DOT output generation.
///
/// ```
/// use jtree_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     show_separators: false,
///     ..DotConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for graph nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for cliques (default: "box")
    pub clique_shape: &'static str,
    /// Style for fill edges (default: "dashed")
    pub fill_edge_style: &'static str,
    /// Whether to label tree edges with their separator (default: true)
    pub show_separators: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            clique_shape: "box",
            fill_edge_style: "dashed",
            show_separators: true,
        }
    }
}

fn fmt_set(set: &NodeSet) -> String {
    let items: Vec<String> = set.iter().map(|n| n.to_string()).collect();
    format!("{{{}}}", items.join(", "))
}

impl CliqueGraph {
    /// Converts a clique graph to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts a clique graph to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.clique_shape)?;

        for (id, clique) in self.cliques() {
            writeln!(dot, "c{} [label=\"C{}: {}\"];", id, id, fmt_set(clique))?;
        }
        for (a, b) in self.edges() {
            if config.show_separators {
                writeln!(dot, "c{} -- c{} [label=\"{}\"];", a, b, fmt_set(&self.separator(a, b)))?;
            } else {
                writeln!(dot, "c{} -- c{};", a, b)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl UndiGraph {
    /// Converts a graph to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&BTreeSet::new(), &DotConfig::default())
    }

    /// Converts a graph to DOT format, drawing `fill_ins` (which are added if
    /// missing from the graph) with the fill edge style.
    pub fn to_dot_with_config(&self, fill_ins: &BTreeSet<Edge>, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        for node in self.nodes() {
            writeln!(dot, "{};", node)?;
        }
        for edge in self.edges() {
            if !fill_ins.contains(&edge) {
                writeln!(dot, "{} -- {};", edge.first(), edge.second())?;
            }
        }
        for edge in fill_ins {
            writeln!(dot, "{} -- {} [style={}];", edge.first(), edge.second(), config.fill_edge_style)?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
