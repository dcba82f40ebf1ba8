//! Incremental maintenance of junction trees.
//!
//! # Overview
//!
//! [`IncrementalTriangulation`] keeps three coupled structures in sync with an
//! undirected graph that is edited node by node and edge by edge:
//!
//! - the **graph** itself, with a weight (domain size) per node,
//! - a **junction tree** (JT) over the cliques of a triangulation of the graph,
//! - the **maximal prime subgraph tree** (MPS tree), obtained from the junction
//!   tree by merging adjacent cliques whose separator is not complete in the graph.
//!
//! Edits never re-triangulate the whole graph. They either patch the trees
//! directly (new isolated nodes, edges joining two components, node removals) or
//! mark the maximal prime subgraphs they invalidate as *affected*. The next query
//! runs [`update_triangulation`][IncrementalTriangulation::update_triangulation],
//! which hands each connected region of affected cliques to the owned batch
//! [`Triangulation`] and splices the result back into both trees.
//!
//! # Laziness
//!
//! Three flags gate the deferred work:
//!
//! - `require_update`: some MPS is affected and the trees may not cover the graph,
//! - `require_elimination_order`: the elimination order must be collected again,
//! - `require_created_jt_cliques`: the created-clique map must be collected again.
//!
//! Bursts of edits (e.g. a structure learning search trying and reverting edges)
//! therefore pay for a single local re-triangulation.
//!
//! # Determinism
//!
//! All maps are ordered, so a given sequence of edits always produces the same
//! trees. The result is *a* valid triangulation of the final graph, not
//! necessarily the one a from-scratch run would produce.
//!
//! # References
//!
//! - J. Flores, J. Gámez, K. Olesen. "Incremental compilation of Bayesian networks."
//!   UAI 2003.
//! - K. Olesen, A. Madsen. "Maximal prime subgraph decomposition of Bayesian networks."
//!   IEEE Trans. SMC-B, 2002.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use num_bigint::BigUint;

use crate::clique_graph::CliqueGraph;
use crate::default_triangulation::DefaultTriangulation;
use crate::error::{Result, TriangulationError};
use crate::graph::UndiGraph;
use crate::triangulation::Triangulation;
use crate::types::{CliqueId, Edge, NodeId, NodeSet, NodeWeights};
use crate::utils::total_weight;

/// Statistics collected while maintaining the triangulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Number of `update_triangulation` calls that had pending work
    pub updates: usize,
    /// Number of affected regions handed to the batch triangulation
    pub regions: usize,
    /// Number of edges that joined two components without any triangulation
    pub direct_joins: usize,
    /// Number of junction tree cliques created by re-triangulations
    pub cliques_created: usize,
    /// Number of junction tree cliques removed by re-triangulations
    pub cliques_removed: usize,
}

/// Outcome of the search for `y` started from an MPS containing `x`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum LinkSearch {
    /// `y` is not in the tree containing `x`.
    NotFound,
    /// `y` was found and the path towards `x` has been marked as affected.
    Marked,
}

/// A triangulation maintained under node and edge insertions and deletions.
#[derive(Debug, Clone)]
pub struct IncrementalTriangulation {
    pub(crate) graph: UndiGraph,
    pub(crate) weights: NodeWeights,
    pub(crate) junction_tree: CliqueGraph,
    pub(crate) max_prime_tree: CliqueGraph,

    /// MPS ids whose label contains the node.
    pub(crate) mps_of_node: BTreeMap<NodeId, Vec<CliqueId>>,
    /// JT cliques merged into each MPS.
    pub(crate) cliques_of_mps: BTreeMap<CliqueId, Vec<CliqueId>>,
    /// Owning MPS of each JT clique.
    pub(crate) mps_of_clique: BTreeMap<CliqueId, CliqueId>,
    /// MPS that must be re-triangulated on the next update.
    pub(crate) mps_affected: BTreeMap<CliqueId, bool>,

    triangulation: Box<dyn Triangulation>,

    pub(crate) require_update: bool,
    pub(crate) require_elimination_order: bool,
    pub(crate) elimination_order: Vec<NodeId>,
    pub(crate) reverse_elimination_order: BTreeMap<NodeId, usize>,
    pub(crate) require_created_jt_cliques: bool,
    pub(crate) created_jt_cliques: BTreeMap<NodeId, CliqueId>,

    /// Triangulated graph and fill edges derived from the junction tree.
    filled: Option<(UndiGraph, BTreeSet<Edge>)>,

    stats: UpdateStats,
}

impl Default for IncrementalTriangulation {
    fn default() -> Self {
        Self::new(&DefaultTriangulation::default())
    }
}

impl IncrementalTriangulation {
    /// Creates an empty incremental triangulation.
    ///
    /// The engine owns a fresh instance of `triangulation` (obtained through
    /// [`new_factory`][Triangulation::new_factory]) which it invokes on affected regions.
    pub fn new(triangulation: &dyn Triangulation) -> Self {
        Self {
            graph: UndiGraph::new(),
            weights: NodeWeights::new(),
            junction_tree: CliqueGraph::new(),
            max_prime_tree: CliqueGraph::new(),
            mps_of_node: BTreeMap::new(),
            cliques_of_mps: BTreeMap::new(),
            mps_of_clique: BTreeMap::new(),
            mps_affected: BTreeMap::new(),
            triangulation: triangulation.new_factory(),
            require_update: false,
            require_elimination_order: false,
            elimination_order: Vec::new(),
            reverse_elimination_order: BTreeMap::new(),
            require_created_jt_cliques: false,
            created_jt_cliques: BTreeMap::new(),
            filled: None,
            stats: UpdateStats::default(),
        }
    }

    /// Creates an incremental triangulation of `graph` by adding its nodes and
    /// edges one at a time.
    ///
    /// Fails with [`MissingWeight`][TriangulationError::MissingWeight] if some
    /// node of `graph` has no weight.
    pub fn from_graph(triangulation: &dyn Triangulation, graph: &UndiGraph, weights: &NodeWeights) -> Result<Self> {
        let mut it = Self::new(triangulation);
        it.set_graph(graph, weights)?;
        Ok(it)
    }

    /// The current graph.
    pub fn graph(&self) -> &UndiGraph {
        &self.graph
    }

    /// The weights of the current graph nodes.
    pub fn weights(&self) -> &NodeWeights {
        &self.weights
    }

    /// Counters of the updates run since creation or the last [`clear`][Self::clear].
    pub fn stats(&self) -> &UpdateStats {
        &self.stats
    }

    /// Checks whether an update is pending.
    pub fn is_update_required(&self) -> bool {
        self.require_update
    }

    /// Removes every node, edge and clique, and resets the update counters.
    pub fn clear(&mut self) {
        debug!("clear()");
        self.graph.clear();
        self.weights.clear();
        self.junction_tree.clear();
        self.max_prime_tree.clear();
        self.mps_of_node.clear();
        self.cliques_of_mps.clear();
        self.mps_of_clique.clear();
        self.mps_affected.clear();
        self.triangulation.clear();
        self.require_update = false;
        self.require_elimination_order = false;
        self.elimination_order.clear();
        self.reverse_elimination_order.clear();
        self.require_created_jt_cliques = false;
        self.created_jt_cliques.clear();
        self.filled = None;
        self.stats = UpdateStats::default();
    }

    /// Replaces the current graph by `graph`.
    ///
    /// Nothing is changed if some node of `graph` has no weight.
    pub fn set_graph(&mut self, graph: &UndiGraph, weights: &NodeWeights) -> Result<()> {
        if let Some(node) = graph.nodes().find(|n| !weights.contains_key(n)) {
            return Err(TriangulationError::MissingWeight(node));
        }
        self.clear();
        for node in graph.nodes() {
            self.add_node(node, weights[&node]);
        }
        for edge in graph.edges() {
            self.add_edge(edge.first(), edge.second());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------

    /// Adds a new MPS labelled `label` and registers it in `mps_of_node`.
    fn new_mps(&mut self, label: NodeSet) -> CliqueId {
        let nodes: Vec<NodeId> = label.iter().copied().collect();
        let mps = self.max_prime_tree.add_node(label);
        for node in nodes {
            self.mps_of_node.entry(node).or_default().push(mps);
        }
        self.mps_affected.insert(mps, false);
        self.cliques_of_mps.insert(mps, Vec::new());
        mps
    }

    /// Makes `clique` one of the cliques of `mps`.
    fn attach_clique(&mut self, clique: CliqueId, mps: CliqueId) {
        self.cliques_of_mps.entry(mps).or_default().push(clique);
        self.mps_of_clique.insert(clique, mps);
    }

    /// Removes `mps` from the MPS tree and the node index, and returns its cliques.
    ///
    /// The returned cliques still point to `mps` in `mps_of_clique`; callers either
    /// erase or re-attach them.
    fn remove_mps(&mut self, mps: CliqueId) -> Vec<CliqueId> {
        if let Some(label) = self.max_prime_tree.get(mps) {
            for node in label {
                if let Some(list) = self.mps_of_node.get_mut(node) {
                    list.retain(|&m| m != mps);
                }
            }
        }
        self.max_prime_tree.erase_node(mps);
        self.mps_affected.remove(&mps);
        self.cliques_of_mps.remove(&mps).unwrap_or_default()
    }

    /// Some clique of `mps` containing `node`.
    fn clique_of_mps_containing(&self, mps: CliqueId, node: NodeId) -> CliqueId {
        let cliques = &self.cliques_of_mps[&mps];
        cliques
            .iter()
            .copied()
            .find(|&c| self.junction_tree.clique(c).contains(&node))
            .unwrap_or_else(|| panic!("MPS {} has no clique containing node {}", mps, node))
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Adds an isolated node with the given weight. Does nothing if the node exists.
    pub fn add_node(&mut self, node: NodeId, weight: u64) {
        if !self.graph.add_node(node) {
            return;
        }
        debug!("add_node({}, weight = {})", node, weight);
        self.filled = None;
        self.weights.insert(node, weight);

        let clique = self.junction_tree.add_node(NodeSet::from([node]));
        let mps = self.new_mps(NodeSet::from([node]));
        self.attach_clique(clique, mps);

        if !self.require_elimination_order {
            self.elimination_order.push(node);
            self.reverse_elimination_order.insert(node, self.elimination_order.len() - 1);
        }
        if !self.require_created_jt_cliques {
            self.created_jt_cliques.insert(node, clique);
        }
    }

    /// Adds the edge `x -- y`.
    ///
    /// Does nothing if `x == y`, if either node is missing or if the edge exists.
    pub fn add_edge(&mut self, x: NodeId, y: NodeId) {
        if x == y || !self.graph.exists_node(x) || !self.graph.exists_node(y) || self.graph.exists_edge(x, y) {
            return;
        }
        debug!("add_edge({}, {})", x, y);
        self.filled = None;
        self.graph.add_edge(x, y);

        let mps_x = self.mps_of_node[&x][0];
        match self.mark_affected_mps_by_add_link(mps_x, x, y) {
            LinkSearch::Marked => {
                self.require_update = true;
                self.require_created_jt_cliques = true;
            }
            LinkSearch::NotFound => self.join_components(x, y),
        }
        self.require_elimination_order = true;
    }

    /// Searches the MPS tree from `start` (which contains `x`) for an MPS
    /// containing `y`, and marks the path between the MPS containing `y` and the
    /// nearest MPS containing `x`.
    fn mark_affected_mps_by_add_link(&mut self, start: CliqueId, x: NodeId, y: NodeId) -> LinkSearch {
        let mut parent: BTreeMap<CliqueId, CliqueId> = BTreeMap::new();
        let mut stack = vec![(start, start)];
        let mut found = None;

        while let Some((mps, from)) = stack.pop() {
            parent.insert(mps, from);
            if self.max_prime_tree.clique(mps).contains(&y) {
                found = Some(mps);
                break;
            }
            for &other in self.max_prime_tree.neighbours(mps) {
                if other != from {
                    stack.push((other, mps));
                }
            }
        }

        let Some(mut mps) = found else {
            return LinkSearch::NotFound;
        };
        loop {
            trace!("add_edge({}, {}): MPS {} affected", x, y, mps);
            self.mps_affected.insert(mps, true);
            if self.max_prime_tree.clique(mps).contains(&x) || mps == start {
                break;
            }
            mps = parent[&mps];
        }
        LinkSearch::Marked
    }

    /// Links the components of `x` and `y` through a new `{x, y}` clique.
    fn join_components(&mut self, x: NodeId, y: NodeId) {
        let mps_x = self.mps_of_node[&x][0];
        let mps_y = self.mps_of_node[&y][0];
        let clique_x = self.clique_of_mps_containing(mps_x, x);
        let clique_y = self.clique_of_mps_containing(mps_y, y);
        trace!("add_edge({}, {}): joining cliques {} and {}", x, y, clique_x, clique_y);

        let label = NodeSet::from([x, y]);
        let new_clique = self.junction_tree.add_node(label.clone());
        self.junction_tree.add_edge(new_clique, clique_x);
        self.junction_tree.add_edge(new_clique, clique_y);

        let new_mps = self.new_mps(label);
        self.attach_clique(new_clique, new_mps);
        self.max_prime_tree.add_edge(new_mps, mps_x);
        self.max_prime_tree.add_edge(new_mps, mps_y);

        for mps in [mps_x, mps_y] {
            if self.max_prime_tree.clique(mps).len() == 1 && !self.mps_affected[&mps] {
                self.collapse_singleton_mps(mps, new_clique, new_mps);
            }
        }
        self.stats.direct_joins += 1;
    }

    /// Replaces a singleton MPS (and its clique) by the clique containing it.
    fn collapse_singleton_mps(&mut self, mps: CliqueId, new_clique: CliqueId, new_mps: CliqueId) {
        let neighbours: Vec<CliqueId> = self.max_prime_tree.neighbours(mps).iter().copied().collect();
        for other in neighbours {
            if other != new_mps {
                self.max_prime_tree.add_edge(other, new_mps);
            }
        }

        for clique in self.remove_mps(mps) {
            let neighbours: Vec<CliqueId> = self.junction_tree.neighbours(clique).iter().copied().collect();
            for other in neighbours {
                if other != new_clique {
                    self.junction_tree.add_edge(other, new_clique);
                }
            }
            self.junction_tree.erase_node(clique);
            self.mps_of_clique.remove(&clique);
            if !self.require_created_jt_cliques {
                for created in self.created_jt_cliques.values_mut() {
                    if *created == clique {
                        *created = new_clique;
                    }
                }
            }
        }
    }

    /// Removes the edge. Does nothing if it does not exist.
    pub fn erase_edge(&mut self, edge: Edge) {
        let (x, y) = (edge.first(), edge.second());
        if !self.graph.exists_edge(x, y) {
            return;
        }
        debug!("erase_edge({})", edge);
        self.filled = None;

        // Find an MPS containing both endpoints, scanning the shorter list.
        let mps_x = &self.mps_of_node[&x];
        let mps_y = &self.mps_of_node[&y];
        let (candidates, other) = if mps_x.len() <= mps_y.len() { (mps_x, y) } else { (mps_y, x) };
        let start = candidates
            .iter()
            .copied()
            .find(|&m| self.max_prime_tree.clique(m).contains(&other))
            .unwrap_or(mps_x[0]);

        self.mark_affected_mps_by_remove_link(start, x, y);
        self.require_update = true;
        self.require_elimination_order = true;
        self.require_created_jt_cliques = true;
        self.graph.erase_edge(x, y);
    }

    /// Marks `start` and every MPS reachable from it through separators
    /// containing both `x` and `y`.
    fn mark_affected_mps_by_remove_link(&mut self, start: CliqueId, x: NodeId, y: NodeId) {
        let mut stack = vec![(start, start)];
        while let Some((mps, from)) = stack.pop() {
            trace!("erase_edge({}, {}): MPS {} affected", x, y, mps);
            self.mps_affected.insert(mps, true);
            for &other in self.max_prime_tree.neighbours(mps) {
                if other == from {
                    continue;
                }
                let label = self.max_prime_tree.clique(other);
                if label.contains(&x) && label.contains(&y) {
                    stack.push((other, mps));
                }
            }
        }
    }

    /// Removes the node and its incident edges. Does nothing if it does not exist.
    pub fn erase_node(&mut self, x: NodeId) {
        if !self.graph.exists_node(x) {
            return;
        }
        debug!("erase_node({})", x);
        self.filled = None;

        let neighbours: Vec<NodeId> = self.graph.neighbours(x).iter().copied().collect();
        for y in neighbours {
            self.erase_edge(Edge::new(x, y));
        }

        for mps in self.mps_of_node.remove(&x).unwrap_or_default() {
            // Links between affected cliques hold a pending region together and
            // are kept until the update replaces them.
            let affected = self.mps_affected.get(&mps).copied().unwrap_or(false);
            self.max_prime_tree.erase_from_clique(mps, x);
            prune_empty_separators(&mut self.max_prime_tree, mps, |other| {
                affected && self.mps_affected.get(&other).copied().unwrap_or(false)
            });

            let cliques = self.cliques_of_mps[&mps].clone();
            for clique in cliques {
                if !self.junction_tree.erase_from_clique(clique, x) {
                    continue;
                }
                prune_empty_separators(&mut self.junction_tree, clique, |other| {
                    affected
                        && self
                            .mps_of_clique
                            .get(&other)
                            .is_some_and(|m| self.mps_affected.get(m).copied().unwrap_or(false))
                });
                if !affected && self.junction_tree.clique(clique).is_empty() {
                    self.junction_tree.erase_node(clique);
                    self.mps_of_clique.remove(&clique);
                    if let Some(list) = self.cliques_of_mps.get_mut(&mps) {
                        list.retain(|&c| c != clique);
                    }
                }
            }

            if !affected && self.max_prime_tree.clique(mps).is_empty() {
                self.max_prime_tree.erase_node(mps);
                self.mps_affected.remove(&mps);
                self.cliques_of_mps.remove(&mps);
            }
        }

        if !self.require_elimination_order {
            if let Some(pos) = self.reverse_elimination_order.remove(&x) {
                self.elimination_order.remove(pos);
                for (i, &node) in self.elimination_order.iter().enumerate().skip(pos) {
                    self.reverse_elimination_order.insert(node, i);
                }
            }
        }
        self.created_jt_cliques.remove(&x);

        self.graph.erase_node(x);
        self.weights.remove(&x);
    }

    // ------------------------------------------------------------------
    // Re-triangulation
    // ------------------------------------------------------------------

    /// Re-triangulates every affected region. Does nothing if no edit is pending.
    ///
    /// Errors of the batch triangulation are propagated unchanged.
    pub fn update_triangulation(&mut self) -> Result<()> {
        if !self.require_update {
            return Ok(());
        }

        let affected_mps: Vec<CliqueId> = self
            .mps_affected
            .iter()
            .filter(|&(_, &affected)| affected)
            .map(|(&mps, _)| mps)
            .collect();
        debug!("update_triangulation(): {} affected MPS", affected_mps.len());

        // Affected cliques, flagged once they belong to a region.
        let mut visited: BTreeMap<CliqueId, bool> = BTreeMap::new();
        for mps in &affected_mps {
            for &clique in &self.cliques_of_mps[mps] {
                visited.insert(clique, false);
            }
        }

        let mut new_cliques: BTreeSet<CliqueId> = BTreeSet::new();
        let mut absorbed: Vec<(CliqueId, CliqueId)> = Vec::new();
        let mut absorbing: BTreeSet<CliqueId> = BTreeSet::new();
        let mut touched: Vec<(CliqueId, CliqueId)> = Vec::new();

        let roots: Vec<CliqueId> = visited.keys().copied().collect();
        for root in roots {
            if visited[&root] {
                continue;
            }
            let (region_nodes, frontier) = self.set_up_connected_triangulation(root, &mut visited);
            if region_nodes.is_empty() {
                continue;
            }
            let region = self.graph.induced_subgraph(&region_nodes);
            debug!(
                "update_triangulation(): region of {} nodes, {} edges, {} frontier cliques",
                region.size(),
                region.size_edges(),
                frontier.len()
            );
            self.stats.regions += 1;

            self.triangulation.set_graph(&region, &self.weights)?;
            let local_tree = self.triangulation.junction_tree()?.clone();

            // Splice the local junction tree in with fresh ids.
            let mut local_to_global: BTreeMap<CliqueId, CliqueId> = BTreeMap::new();
            for (local, clique) in local_tree.cliques() {
                let global = self.junction_tree.add_node(clique.clone());
                local_to_global.insert(local, global);
                new_cliques.insert(global);
            }
            for (a, b) in local_tree.edges() {
                self.junction_tree.add_edge(local_to_global[&a], local_to_global[&b]);
            }

            // Reattach the unaffected neighbours. The clique created by the first
            // eliminated node of a separator contains the whole separator.
            for (affected, kept) in frontier {
                let separator = self.junction_tree.separator(affected, kept);
                let mut first: Option<(usize, NodeId)> = None;
                for &node in &separator {
                    let rank = self.triangulation.elimination_order_of(node)?;
                    if first.map_or(true, |(r, _)| rank < r) {
                        first = Some((rank, node));
                    }
                }
                let Some((_, elim_node)) = first else {
                    continue;
                };
                let local = self.triangulation.created_junction_tree_clique(elim_node)?;
                let to_connect = local_to_global[&local];
                trace!("update_triangulation(): linking clique {} to clique {}", kept, to_connect);
                self.junction_tree.add_edge(kept, to_connect);
                touched.push((kept, to_connect));

                if !new_cliques.contains(&to_connect) {
                    continue;
                }
                let new_label = self.junction_tree.clique(to_connect);
                let kept_label = self.junction_tree.clique(kept);
                let new_in_kept = new_label.is_subset(kept_label);
                let kept_in_new = kept_label.is_subset(new_label);
                if new_in_kept && !absorbing.contains(&to_connect) {
                    // The new clique is redundant: fold it into the kept one.
                    trace!("update_triangulation(): clique {} folded into {}", to_connect, kept);
                    let neighbours: Vec<CliqueId> = self.junction_tree.neighbours(to_connect).iter().copied().collect();
                    for other in neighbours {
                        if other != kept {
                            self.junction_tree.add_edge(other, kept);
                            touched.push((other, kept));
                        }
                    }
                    self.junction_tree.erase_node(to_connect);
                    new_cliques.remove(&to_connect);
                    for global in local_to_global.values_mut() {
                        if *global == to_connect {
                            *global = kept;
                        }
                    }
                } else if kept_in_new
                    && self.junction_tree.neighbours(kept).iter().filter(|c| visited.contains_key(c)).count() == 1
                {
                    // The kept clique is redundant: fold it into the new one and
                    // merge what remains of its MPS with the new cliques.
                    trace!("update_triangulation(): clique {} folded into {}", kept, to_connect);
                    let neighbours: Vec<CliqueId> = self.junction_tree.neighbours(kept).iter().copied().collect();
                    for other in neighbours {
                        if other != to_connect && !visited.contains_key(&other) {
                            self.junction_tree.add_edge(other, to_connect);
                            touched.push((other, to_connect));
                        }
                    }
                    self.junction_tree.erase_node(kept);
                    if let Some(mps) = self.mps_of_clique.remove(&kept) {
                        if let Some(list) = self.cliques_of_mps.get_mut(&mps) {
                            list.retain(|&c| c != kept);
                        }
                        absorbed.push((to_connect, mps));
                        absorbing.insert(to_connect);
                    }
                }
            }
        }

        // Drop the affected cliques and their MPS.
        for mps in affected_mps {
            for clique in self.remove_mps(mps) {
                self.junction_tree.erase_node(clique);
                self.mps_of_clique.remove(&clique);
                self.stats.cliques_removed += 1;
            }
        }
        self.stats.cliques_created += new_cliques.len();

        self.update_max_prime_subgraphs(&new_cliques, absorbed, &touched);

        for affected in self.mps_affected.values_mut() {
            *affected = false;
        }
        self.require_update = false;
        self.require_elimination_order = true;
        self.require_created_jt_cliques = true;
        self.stats.updates += 1;
        Ok(())
    }

    /// Collects the maximal connected set of affected cliques containing `root`.
    ///
    /// Returns the graph nodes of the region and the `(affected, unaffected)`
    /// junction tree edges leaving it.
    fn set_up_connected_triangulation(
        &self,
        root: CliqueId,
        visited: &mut BTreeMap<CliqueId, bool>,
    ) -> (NodeSet, Vec<(CliqueId, CliqueId)>) {
        let mut nodes = NodeSet::new();
        let mut frontier = Vec::new();
        let mut stack = vec![(root, root)];
        visited.insert(root, true);

        while let Some((clique, from)) = stack.pop() {
            nodes.extend(self.junction_tree.clique(clique));
            for &other in self.junction_tree.neighbours(clique) {
                if other == from {
                    continue;
                }
                match visited.get(&other).copied() {
                    Some(false) => {
                        visited.insert(other, true);
                        stack.push((other, clique));
                    }
                    Some(true) => {}
                    None => frontier.push((clique, other)),
                }
            }
        }
        (nodes, frontier)
    }

    /// Rebuilds the MPS of the new cliques.
    ///
    /// Cliques separated by a separator that is not complete in the graph belong
    /// to the same MPS. An old MPS reached through such a separator (or listed in
    /// `absorbed`) is dissolved into the MPS of the new clique.
    fn update_max_prime_subgraphs(
        &mut self,
        new_cliques: &BTreeSet<CliqueId>,
        mut absorbed: Vec<(CliqueId, CliqueId)>,
        touched: &[(CliqueId, CliqueId)],
    ) {
        let mut merges = UnionFind::default();
        for &clique in new_cliques {
            merges.insert(clique);
        }

        for &clique in new_cliques {
            for &other in self.junction_tree.neighbours(clique) {
                let separator = self.junction_tree.separator(clique, other);
                if self.graph.is_complete(&separator) {
                    continue;
                }
                if new_cliques.contains(&other) {
                    merges.union(clique, other);
                } else if let Some(&mps) = self.mps_of_clique.get(&other) {
                    absorbed.push((clique, mps));
                }
            }
        }

        let mut dissolved: BTreeMap<CliqueId, CliqueId> = BTreeMap::new();
        for (clique, mps) in absorbed {
            let representative = match dissolved.get(&mps) {
                Some(&r) => r,
                None => {
                    trace!("update_triangulation(): MPS {} merged with clique {}", mps, clique);
                    let cliques = self.remove_mps(mps);
                    let r = cliques.first().copied().unwrap_or(clique);
                    for &c in &cliques {
                        merges.insert(c);
                        merges.union(r, c);
                    }
                    dissolved.insert(mps, r);
                    r
                }
            };
            merges.union(clique, representative);
        }

        // One MPS per group of merged cliques.
        let mut members: Vec<CliqueId> = Vec::new();
        for (_, group) in merges.groups() {
            let mut label = NodeSet::new();
            for &clique in &group {
                label.extend(self.junction_tree.clique(clique));
            }
            let mps = self.new_mps(label);
            for &clique in &group {
                self.attach_clique(clique, mps);
            }
            members.extend(group);
        }

        let mut links: Vec<(CliqueId, CliqueId)> = touched.to_vec();
        for &clique in &members {
            for &other in self.junction_tree.neighbours(clique) {
                links.push((clique, other));
            }
        }
        for (a, b) in links {
            if !self.junction_tree.exists_edge(a, b) {
                continue;
            }
            let (mps_a, mps_b) = (self.mps_of_clique[&a], self.mps_of_clique[&b]);
            if mps_a != mps_b {
                self.max_prime_tree.add_edge(mps_a, mps_b);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The junction tree, brought up to date first.
    pub fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        self.update_triangulation()?;
        Ok(&self.junction_tree)
    }

    /// The maximal prime subgraph tree, brought up to date first.
    pub fn max_prime_junction_tree(&mut self) -> Result<&CliqueGraph> {
        self.update_triangulation()?;
        Ok(&self.max_prime_tree)
    }

    /// An elimination order of all graph nodes consistent with the junction tree.
    pub fn elimination_order(&mut self) -> Result<&[NodeId]> {
        self.update_triangulation()?;
        if self.require_elimination_order {
            self.collect_elimination_order();
        }
        Ok(&self.elimination_order)
    }

    /// The zero-based rank of `node` in the elimination order.
    pub fn elimination_order_of(&mut self, node: NodeId) -> Result<usize> {
        if !self.graph.exists_node(node) {
            return Err(TriangulationError::NodeNotFound(node));
        }
        self.elimination_order()?;
        self.reverse_elimination_order
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    /// For every node, the junction tree clique created by its elimination.
    pub fn created_junction_tree_cliques(&mut self) -> Result<&BTreeMap<NodeId, CliqueId>> {
        self.update_triangulation()?;
        if self.require_created_jt_cliques {
            self.collect_created_cliques();
        }
        Ok(&self.created_jt_cliques)
    }

    /// The junction tree clique created by the elimination of `node`.
    pub fn created_junction_tree_clique(&mut self, node: NodeId) -> Result<CliqueId> {
        if !self.graph.exists_node(node) {
            return Err(TriangulationError::NodeNotFound(node));
        }
        self.created_junction_tree_cliques()?
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    /// The MPS owning the clique created by the elimination of `node`.
    pub fn created_max_prime_subgraph(&mut self, node: NodeId) -> Result<CliqueId> {
        let clique = self.created_junction_tree_clique(node)?;
        self.mps_of_clique
            .get(&clique)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    /// Sum over the junction tree cliques of the product of their node weights.
    pub fn total_clique_weight(&mut self) -> Result<BigUint> {
        self.update_triangulation()?;
        Ok(total_weight(&self.junction_tree, &self.weights))
    }

    fn collect_elimination_order(&mut self) {
        self.elimination_order.clear();
        self.reverse_elimination_order.clear();
        for (clique, parent) in collect_order(&self.junction_tree) {
            for &node in self.junction_tree.clique(clique) {
                if parent.map_or(true, |p| !self.junction_tree.clique(p).contains(&node)) {
                    self.reverse_elimination_order.insert(node, self.elimination_order.len());
                    self.elimination_order.push(node);
                }
            }
        }
        self.require_elimination_order = false;
    }

    fn collect_created_cliques(&mut self) {
        self.created_jt_cliques.clear();
        for (clique, parent) in collect_order(&self.junction_tree) {
            for &node in self.junction_tree.clique(clique) {
                if parent.map_or(true, |p| !self.junction_tree.clique(p).contains(&node)) {
                    self.created_jt_cliques.insert(node, clique);
                }
            }
        }
        self.require_created_jt_cliques = false;
    }

    pub(crate) fn compute_filled_graph(&mut self) -> Result<&(UndiGraph, BTreeSet<Edge>)> {
        self.update_triangulation()?;
        if self.filled.is_none() {
            let mut graph = self.graph.clone();
            let mut fill_ins = BTreeSet::new();
            for (_, clique) in self.junction_tree.cliques() {
                let nodes: Vec<NodeId> = clique.iter().copied().collect();
                for (i, &a) in nodes.iter().enumerate() {
                    for &b in &nodes[i + 1..] {
                        if graph.add_edge(a, b) {
                            fill_ins.insert(Edge::new(a, b));
                        }
                    }
                }
            }
            self.filled = Some((graph, fill_ins));
        }
        self.filled.as_ref().ok_or(TriangulationError::NoGraph)
    }
}

impl Triangulation for IncrementalTriangulation {
    fn new_factory(&self) -> Box<dyn Triangulation> {
        Box::new(IncrementalTriangulation::new(self.triangulation.as_ref()))
    }

    fn copy_factory(&self) -> Box<dyn Triangulation> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        IncrementalTriangulation::clear(self)
    }

    fn set_graph(&mut self, graph: &UndiGraph, weights: &NodeWeights) -> Result<()> {
        IncrementalTriangulation::set_graph(self, graph, weights)
    }

    fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        IncrementalTriangulation::junction_tree(self)
    }

    fn elimination_order(&mut self) -> Result<&[NodeId]> {
        IncrementalTriangulation::elimination_order(self)
    }

    fn elimination_order_of(&mut self, node: NodeId) -> Result<usize> {
        IncrementalTriangulation::elimination_order_of(self, node)
    }

    fn created_junction_tree_cliques(&mut self) -> Result<&BTreeMap<NodeId, CliqueId>> {
        IncrementalTriangulation::created_junction_tree_cliques(self)
    }

    fn created_junction_tree_clique(&mut self, node: NodeId) -> Result<CliqueId> {
        IncrementalTriangulation::created_junction_tree_clique(self, node)
    }

    fn triangulated_graph(&mut self) -> Result<&UndiGraph> {
        Ok(&self.compute_filled_graph()?.0)
    }

    fn fill_ins(&mut self) -> Result<&BTreeSet<Edge>> {
        Ok(&self.compute_filled_graph()?.1)
    }
}

/// Removes the edges of `id` whose separator is empty, except those towards
/// the neighbours selected by `keep`.
fn prune_empty_separators(tree: &mut CliqueGraph, id: CliqueId, keep: impl Fn(CliqueId) -> bool) {
    let neighbours: Vec<CliqueId> = tree.neighbours(id).iter().copied().collect();
    for other in neighbours {
        if tree.clique(id).is_disjoint(tree.clique(other)) && !keep(other) {
            tree.erase_edge(id, other);
        }
    }
}

/// Post-order traversal of a clique forest: every clique is reported after all
/// of its children, together with its parent (`None` for roots).
fn collect_order(tree: &CliqueGraph) -> Vec<(CliqueId, Option<CliqueId>)> {
    let mut visited = BTreeSet::new();
    let mut result = Vec::with_capacity(tree.size());
    for root in tree.nodes() {
        if !visited.insert(root) {
            continue;
        }
        let mut stack = vec![(root, None, false)];
        while let Some((clique, parent, expanded)) = stack.pop() {
            if expanded {
                result.push((clique, parent));
                continue;
            }
            stack.push((clique, parent, true));
            for &other in tree.neighbours(clique) {
                if Some(other) != parent && visited.insert(other) {
                    stack.push((other, Some(clique), false));
                }
            }
        }
    }
    result
}

/// Union-find over clique ids.
#[derive(Debug, Default)]
struct UnionFind {
    parent: BTreeMap<CliqueId, CliqueId>,
}

impl UnionFind {
    fn insert(&mut self, id: CliqueId) {
        self.parent.entry(id).or_insert(id);
    }

    fn find(&mut self, id: CliqueId) -> CliqueId {
        let mut root = id;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        let mut node = id;
        while node != root {
            let next = self.parent.insert(node, root).unwrap_or(root);
            node = next;
        }
        root
    }

    fn union(&mut self, a: CliqueId, b: CliqueId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(high, low);
        }
    }

    /// Groups of merged ids, keyed by their representative.
    fn groups(&mut self) -> BTreeMap<CliqueId, Vec<CliqueId>> {
        let ids: Vec<CliqueId> = self.parent.keys().copied().collect();
        let mut groups: BTreeMap<CliqueId, Vec<CliqueId>> = BTreeMap::new();
        for id in ids {
            let root = self.find(id);
            groups.entry(root).or_default().push(id);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn labels(tree: &CliqueGraph) -> Vec<NodeSet> {
        let mut labels: Vec<NodeSet> = tree.cliques().map(|(_, c)| c.clone()).collect();
        labels.sort();
        labels
    }

    fn path3() -> IncrementalTriangulation {
        let mut it = IncrementalTriangulation::default();
        for node in 1..=3 {
            it.add_node(node, 2);
        }
        it.add_edge(1, 2);
        it.add_edge(2, 3);
        it
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut it = IncrementalTriangulation::default();
        it.add_node(7, 3);
        it.add_node(7, 5);
        assert_eq!(it.graph().size(), 1);
        assert_eq!(it.weights()[&7], 3);
        assert_eq!(it.junction_tree().unwrap().size(), 1);
        assert_eq!(it.max_prime_junction_tree().unwrap().size(), 1);
        assert_eq!(it.elimination_order().unwrap(), &[7]);
        let c = it.created_junction_tree_clique(7).unwrap();
        assert_eq!(it.junction_tree().unwrap().clique(c), &NodeSet::from([7]));
    }

    #[test]
    fn test_path_is_built_without_triangulating() {
        let mut it = path3();
        assert!(!it.is_update_required());
        assert_eq!(it.stats().direct_joins, 2);

        let jt = it.junction_tree().unwrap().clone();
        assert_eq!(labels(&jt), vec![NodeSet::from([1, 2]), NodeSet::from([2, 3])]);
        assert_eq!(jt.size_edges(), 1);
        let (a, b) = jt.edges().next().unwrap();
        assert_eq!(jt.separator(a, b), NodeSet::from([2]));
        assert_eq!(it.stats().regions, 0);

        // Separator {2} is complete, so each clique is its own MPS.
        assert_eq!(it.max_prime_junction_tree().unwrap().size(), 2);
    }

    #[test]
    fn test_add_edge_noops() {
        let mut it = path3();
        let before = it.clone();
        it.add_edge(1, 1);
        it.add_edge(1, 9);
        it.add_edge(2, 1);
        assert_eq!(it.graph(), before.graph());
        assert_eq!(it.junction_tree, before.junction_tree);
        assert!(!it.is_update_required());
    }

    #[test]
    fn test_triangle_closes_into_one_clique() {
        let mut it = path3();
        it.add_edge(1, 3);
        assert!(it.is_update_required());
        let jt = it.junction_tree().unwrap().clone();
        assert_eq!(labels(&jt), vec![NodeSet::from([1, 2, 3])]);
        assert_eq!(it.stats().regions, 1);
    }

    #[test]
    fn test_cycle_gets_a_fill_edge() {
        let mut it = IncrementalTriangulation::default();
        for node in 1..=4 {
            it.add_node(node, 2);
        }
        for (x, y) in [(1, 2), (2, 3), (3, 4), (4, 1)] {
            it.add_edge(x, y);
        }
        let jt = it.junction_tree().unwrap().clone();
        assert_eq!(jt.size(), 2);
        assert!(jt.is_join_tree());
        assert_eq!(it.fill_ins().unwrap().len(), 1);

        // The separator of the two triangles is the fill edge, not complete in the
        // graph: both cliques form a single MPS.
        let mpt = it.max_prime_junction_tree().unwrap();
        assert_eq!(labels(mpt), vec![NodeSet::from([1, 2, 3, 4])]);
    }

    #[test]
    fn test_erase_edge_splits_clique() {
        let mut it = path3();
        it.add_edge(1, 3);
        it.update_triangulation().unwrap();
        it.erase_edge(Edge::new(1, 3));
        assert!(it.is_update_required());
        let jt = it.junction_tree().unwrap().clone();
        assert_eq!(labels(&jt), vec![NodeSet::from([1, 2]), NodeSet::from([2, 3])]);
        assert!(jt.is_join_tree());
    }

    #[test]
    fn test_erase_missing_edge_is_noop() {
        let mut it = path3();
        it.erase_edge(Edge::new(1, 3));
        assert!(!it.is_update_required());
    }

    #[test]
    fn test_erase_isolated_node_keeps_order() {
        let mut it = path3();
        it.add_node(4, 2);
        it.elimination_order().unwrap();
        it.erase_node(4);
        assert!(!it.require_elimination_order);
        let order = it.elimination_order().unwrap().to_vec();
        assert_eq!(order.len(), 3);
        assert!(!order.contains(&4));
        for (i, node) in order.iter().enumerate() {
            assert_eq!(it.elimination_order_of(*node).unwrap(), i);
        }
    }

    #[test]
    fn test_erase_node_removes_every_trace() {
        let mut it = path3();
        it.erase_node(2);
        assert!(!it.graph().exists_node(2));
        assert!(!it.mps_of_node.contains_key(&2));
        let jt = it.junction_tree().unwrap().clone();
        assert!(jt.cliques().all(|(_, c)| !c.contains(&2)));
        assert_eq!(labels(&jt), vec![NodeSet::from([1]), NodeSet::from([3])]);
        assert_eq!(it.elimination_order_of(2).unwrap_err(), TriangulationError::NodeNotFound(2));
    }

    #[test]
    fn test_queries_on_missing_node() {
        let mut it = path3();
        assert_eq!(it.elimination_order_of(9).unwrap_err(), TriangulationError::NodeNotFound(9));
        assert_eq!(
            it.created_junction_tree_clique(9).unwrap_err(),
            TriangulationError::NodeNotFound(9)
        );
        assert_eq!(it.created_max_prime_subgraph(9).unwrap_err(), TriangulationError::NodeNotFound(9));
    }

    #[test]
    fn test_created_max_prime_subgraph() {
        let mut it = path3();
        for node in 1..=3 {
            let mps = it.created_max_prime_subgraph(node).unwrap();
            assert!(it.max_prime_junction_tree().unwrap().clique(mps).contains(&node));
        }
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut it = path3();
        it.add_edge(1, 3);
        it.update_triangulation().unwrap();
        let snapshot = it.clone();
        it.update_triangulation().unwrap();
        assert_eq!(it.junction_tree, snapshot.junction_tree);
        assert_eq!(it.max_prime_tree, snapshot.max_prime_tree);
        assert_eq!(it.mps_of_node, snapshot.mps_of_node);
        assert_eq!(it.stats(), snapshot.stats());
    }

    #[test]
    fn test_missing_weight() {
        let g = UndiGraph::from_parts([1, 2], [(1, 2)]);
        let err = IncrementalTriangulation::from_graph(
            &DefaultTriangulation::default(),
            &g,
            &NodeWeights::from([(1, 2)]),
        )
        .unwrap_err();
        assert_eq!(err, TriangulationError::MissingWeight(2));
    }

    #[test]
    fn test_total_clique_weight() {
        let mut it = path3();
        // Two cliques of two binary nodes.
        assert_eq!(it.total_clique_weight().unwrap(), BigUint::from(8u32));
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::default();
        for id in 0..5 {
            uf.insert(id);
        }
        uf.union(3, 4);
        uf.union(4, 1);
        let groups = uf.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&1], vec![1, 3, 4]);
    }

    #[test]
    fn test_collect_order_is_post_order() {
        let mut tree = CliqueGraph::new();
        let a = tree.add_node(NodeSet::from([1, 2]));
        let b = tree.add_node(NodeSet::from([2, 3]));
        let c = tree.add_node(NodeSet::from([3, 4]));
        tree.add_edge(a, b);
        tree.add_edge(b, c);
        let order = collect_order(&tree);
        assert_eq!(order, vec![(c, Some(b)), (b, Some(a)), (a, None)]);
    }
}
