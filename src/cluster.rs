/// Cluster bootstrap.
///
/// Boots a fixed-size cluster of in-process nodes on consecutive ports and
/// distributes per-node preference lists, rotated so node `i`'s list begins
/// at node `i`. Used by the `vestad` binary and by the integration tests.
use crate::client::PeerClient;
use crate::error::VestaResult;
use crate::node::{NodeConfig, VestaNode};
use crate::protocol::Listener;
use crate::types::{rotate_left, NodeAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Grace period between binding the listeners and distributing preference
/// lists, letting the accept loops settle.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

/// Configuration for a bootstrapped cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Port of node 0; node `i` listens on `starting_port + i`.
    pub starting_port: u16,
    /// R: read quorum for every node.
    pub read_quorum: usize,
    /// W: write quorum for every node.
    pub write_quorum: usize,
    /// Number of nodes to boot.
    pub cluster_size: usize,
}

impl ClusterConfig {
    /// Create a cluster config.
    pub fn new(starting_port: u16, read_quorum: usize, write_quorum: usize, cluster_size: usize) -> Self {
        Self {
            starting_port,
            read_quorum,
            write_quorum,
            cluster_size,
        }
    }
}

/// A running cluster of in-process nodes.
pub struct Cluster {
    nodes: Vec<Arc<VestaNode>>,
    handles: Vec<JoinHandle<VestaResult<()>>>,
}

impl Cluster {
    /// Addresses of all nodes, in index order.
    pub fn addrs(&self) -> Vec<NodeAddr> {
        self.nodes.iter().map(|n| n.addr().clone()).collect()
    }

    /// Address of node `index`.
    pub fn addr(&self, index: usize) -> &NodeAddr {
        self.nodes[index].addr()
    }

    /// A fresh client for node `index`.
    pub fn client(&self, index: usize) -> PeerClient {
        PeerClient::new(self.addr(index).clone())
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Block until every accept loop exits (they normally never do).
    pub async fn join(mut self) {
        for handle in std::mem::take(&mut self.handles) {
            let _ = handle.await;
        }
    }

    /// Abort every accept loop.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Boot `cluster_size` nodes on consecutive ports starting at
/// `starting_port`, node id = decimal index, then send each node its
/// rotated preference list.
pub async fn launch(config: &ClusterConfig) -> VestaResult<Cluster> {
    let mut nodes = Vec::with_capacity(config.cluster_size);
    let mut handles = Vec::with_capacity(config.cluster_size);

    for index in 0..config.cluster_size {
        let addr = NodeAddr::new("localhost", config.starting_port + index as u16);
        let node = Arc::new(VestaNode::new(NodeConfig {
            node_id: index.to_string(),
            addr: addr.clone(),
            write_quorum: config.write_quorum,
            read_quorum: config.read_quorum,
        }));

        let listener = Listener::bind(&addr.to_string()).await?;
        handles.push(tokio::spawn(Arc::clone(&node).serve(listener)));
        nodes.push(node);
    }

    tokio::time::sleep(STARTUP_GRACE).await;

    // Distribute rotated preference lists: node i's list begins at node i.
    let addrs: Vec<NodeAddr> = nodes.iter().map(|n| n.addr().clone()).collect();
    let mut preference = addrs.clone();
    for addr in &addrs {
        let mut client = PeerClient::new(addr.clone());
        if !client.send_preference_list(preference.clone()).await {
            warn!(node = %addr, "failed to send preference list");
        }
        client.close();
        preference = rotate_left(&preference);
    }

    info!(
        size = config.cluster_size,
        r = config.read_quorum,
        w = config.write_quorum,
        "cluster ready"
    );

    Ok(Cluster { nodes, handles })
}
