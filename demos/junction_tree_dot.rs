use std::fs;
use std::path::PathBuf;

use clap::Parser;

use jtree_rs::dot::DotConfig;
use jtree_rs::incremental::IncrementalTriangulation;
use jtree_rs::triangulation::Triangulation;
use jtree_rs::types::NodeId;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Side of the grid graph.
    #[arg(value_name = "INT", default_value = "3")]
    side: NodeId,

    /// Output directory for the `.dot` files.
    #[clap(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    // Grid graph: every inner face is a 4-cycle needing a chord.
    let side = args.side;
    let mut it = IncrementalTriangulation::default();
    for node in 0..side * side {
        it.add_node(node, 2);
    }
    for row in 0..side {
        for col in 0..side {
            let node = row * side + col;
            if col + 1 < side {
                it.add_edge(node, node + 1);
            }
            if row + 1 < side {
                it.add_edge(node, node + side);
            }
        }
    }

    let config = DotConfig::default();

    let fill_ins = Triangulation::fill_ins(&mut it)?.clone();
    println!("fill-ins = {}", fill_ins.len());
    let graph_dot = it.graph().to_dot_with_config(&fill_ins, &config)?;
    let jt_dot = it.junction_tree()?.to_dot_with_config(&config)?;
    let mps_dot = it.max_prime_junction_tree()?.to_dot_with_config(&config)?;

    fs::create_dir_all(&args.out)?;
    for (name, dot) in [("graph.dot", graph_dot), ("junction_tree.dot", jt_dot), ("max_prime_tree.dot", mps_dot)] {
        let path = args.out.join(name);
        fs::write(&path, dot)?;
        println!("Wrote {}", path.display());
    }
    println!("Render with: dot -Tpdf junction_tree.dot -o junction_tree.pdf");

    println!("summary = {}", it.summary()?);

    Ok(())
}
