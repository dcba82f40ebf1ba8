use std::time::Instant;

use clap::Parser;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use jtree_rs::incremental::IncrementalTriangulation;
use jtree_rs::types::{Edge, NodeId};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of variables.
    #[arg(value_name = "INT", default_value = "40")]
    n: NodeId,

    /// Number of proposed edits.
    #[clap(long, value_name = "INT", default_value = "1000")]
    steps: usize,

    /// Largest accepted total clique weight, in bits.
    #[clap(long, value_name = "INT", default_value = "24")]
    max_bits: u64,

    /// Random seed.
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Validate the engine after every accepted edit.
    #[clap(long)]
    check: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut it = IncrementalTriangulation::default();
    for node in 0..args.n {
        it.add_node(node, rng.random_range(2..=5));
    }

    // Toy hill climbing: propose a random edge toggle, keep it while the
    // junction tree stays below the weight limit, revert it otherwise.
    let mut accepted = 0;
    let mut rejected = 0;
    for step in 0..args.steps {
        let x = rng.random_range(0..args.n);
        let y = rng.random_range(0..args.n);
        if x == y {
            continue;
        }
        let edge = Edge::new(x, y);
        let adding = !it.graph().exists_edge(x, y);
        if adding {
            it.add_edge(x, y);
        } else {
            it.erase_edge(edge);
        }

        let weight = it.total_clique_weight()?;
        if weight.bits() > args.max_bits {
            if adding {
                it.erase_edge(edge);
            } else {
                it.add_edge(x, y);
            }
            rejected += 1;
        } else {
            accepted += 1;
            if args.check {
                it.check()?;
            }
        }

        if (step + 1) % 100 == 0 {
            log::info!("step {}: {}", step + 1, it.summary()?);
        }
    }

    it.check()?;
    println!("accepted = {}, rejected = {}", accepted, rejected);
    println!("summary = {}", it.summary()?);
    println!("stats = {:?}", it.stats());

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
