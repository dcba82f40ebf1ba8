//! Incremental vs. batch triangulation benchmarks.
//!
//! These benchmarks replay the workload of a structure learning search: a graph
//! is built once, then edges are repeatedly proposed, queried and reverted.
//!
//! Run with:
//! ```bash
//! cargo bench --bench incremental
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use jtree_rs::default_triangulation::DefaultTriangulation;
use jtree_rs::graph::UndiGraph;
use jtree_rs::incremental::IncrementalTriangulation;
use jtree_rs::triangulation::Triangulation;
use jtree_rs::types::{Edge, NodeId, NodeWeights};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helpers
// ============================================================================

/// Random sparse graph: a spanning path plus `extra` random edges.
fn random_graph(n: NodeId, extra: usize, seed: u64) -> (UndiGraph, NodeWeights) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut graph = UndiGraph::new();
    for node in 0..n {
        graph.add_node(node);
    }
    for node in 1..n {
        graph.add_edge(node - 1, node);
    }
    let mut added = 0;
    while added < extra {
        let x = rng.random_range(0..n);
        let y = rng.random_range(0..n);
        if graph.add_edge(x, y) {
            added += 1;
        }
    }
    let weights = graph.nodes().map(|node| (node, rng.random_range(2..=4))).collect();
    (graph, weights)
}

/// Edges absent from `graph`, to be proposed by the search.
fn candidate_edges(graph: &UndiGraph, count: usize, seed: u64) -> Vec<Edge> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let nodes: Vec<NodeId> = graph.nodes().collect();
    let mut edges = Vec::with_capacity(count);
    while edges.len() < count {
        let x = nodes[rng.random_range(0..nodes.len())];
        let y = nodes[rng.random_range(0..nodes.len())];
        if x != y && !graph.exists_edge(x, y) {
            edges.push(Edge::new(x, y));
        }
    }
    edges
}

// ============================================================================
// Benchmark: bootstrap
// ============================================================================

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulation/bootstrap");

    for n in [50, 100, 200] {
        let (graph, weights) = random_graph(n, n as usize / 2, 42);
        group.throughput(Throughput::Elements(graph.size_edges() as u64));

        group.bench_with_input(BenchmarkId::new("batch", n), &n, |b, _| {
            b.iter(|| {
                let mut t = DefaultTriangulation::default();
                t.set_graph(&graph, &weights).unwrap();
                t.junction_tree().unwrap().size()
            });
        });

        group.bench_with_input(BenchmarkId::new("incremental", n), &n, |b, _| {
            b.iter(|| {
                let mut it =
                    IncrementalTriangulation::from_graph(&DefaultTriangulation::default(), &graph, &weights).unwrap();
                it.junction_tree().unwrap().size()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: propose / query / revert
// ============================================================================

fn bench_edge_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulation/edge_toggle");
    group.sample_size(20);

    for n in [50, 100, 200] {
        let (graph, weights) = random_graph(n, n as usize / 2, 7);
        let candidates = candidate_edges(&graph, 20, 8);
        group.throughput(Throughput::Elements(candidates.len() as u64));

        group.bench_with_input(BenchmarkId::new("batch", n), &n, |b, _| {
            b.iter(|| {
                let mut total = 0;
                let mut g = graph.clone();
                for edge in &candidates {
                    g.add_edge(edge.first(), edge.second());
                    let mut t = DefaultTriangulation::default();
                    t.set_graph(&g, &weights).unwrap();
                    total += t.junction_tree().unwrap().size();
                    g.erase_edge(edge.first(), edge.second());
                }
                total
            });
        });

        let base = IncrementalTriangulation::from_graph(&DefaultTriangulation::default(), &graph, &weights).unwrap();
        group.bench_with_input(BenchmarkId::new("incremental", n), &n, |b, _| {
            b.iter_batched(
                || base.clone(),
                |mut it| {
                    let mut total = 0;
                    for edge in &candidates {
                        it.add_edge(edge.first(), edge.second());
                        total += it.junction_tree().unwrap().size();
                        it.erase_edge(*edge);
                    }
                    total
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: lazy bursts
// ============================================================================

fn bench_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulation/burst");

    let (graph, weights) = random_graph(100, 50, 11);
    let candidates = candidate_edges(&graph, 10, 12);
    let base = IncrementalTriangulation::from_graph(&DefaultTriangulation::default(), &graph, &weights).unwrap();

    group.bench_function("add_then_query_once", |b| {
        b.iter_batched(
            || base.clone(),
            |mut it| {
                for edge in &candidates {
                    it.add_edge(edge.first(), edge.second());
                }
                it.junction_tree().unwrap().size()
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("add_and_query_each", |b| {
        b.iter_batched(
            || base.clone(),
            |mut it| {
                let mut total = 0;
                for edge in &candidates {
                    it.add_edge(edge.first(), edge.second());
                    total += it.junction_tree().unwrap().size();
                }
                total
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_bootstrap, bench_edge_toggle, bench_burst);
criterion_main!(benches);
