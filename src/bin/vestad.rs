/// Vesta cluster bootstrap.
///
/// Boots a fixed-size cluster of nodes on consecutive ports and distributes
/// rotated preference lists, then serves until killed.
///
/// Usage:
///   vestad <starting_port> <r_value> <w_value> <cluster_size>
use anyhow::Result;
use clap::Parser;
use vesta_kv::{cluster, ClusterConfig};

/// Boot a Vesta cluster on consecutive local ports.
#[derive(Parser, Debug)]
#[command(name = "vestad", version, about)]
struct Args {
    /// Port of node 0; node i listens on starting_port + i
    starting_port: u16,
    /// Read quorum (R) for every node
    r_value: usize,
    /// Write quorum (W) for every node
    w_value: usize,
    /// Number of nodes to boot
    cluster_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    vesta_kv::init_logging();

    let args = Args::parse();
    let config = ClusterConfig::new(
        args.starting_port,
        args.r_value,
        args.w_value,
        args.cluster_size,
    );

    let cluster = cluster::launch(&config).await?;
    cluster.join().await;

    Ok(())
}
