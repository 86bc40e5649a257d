/// Shared harness for the cluster integration tests.
///
/// Each test launches its own in-process cluster on a dedicated port range
/// (ranges are unique across all test files so suites can run in parallel)
/// and talks to it exclusively through `PeerClient`, the same path external
/// clients use.
use vesta_kv::{cluster, Cluster, ClusterConfig, GetResult};

/// Launch a cluster, panicking on bootstrap failure.
pub async fn launch(starting_port: u16, r: usize, w: usize, size: usize) -> Cluster {
    cluster::launch(&ClusterConfig::new(starting_port, r, w, size))
        .await
        .expect("cluster bootstrap failed")
}

/// The entry values of a get result, sorted for set comparison.
pub fn sorted_values(result: &GetResult) -> Vec<Vec<u8>> {
    let mut values: Vec<Vec<u8>> = result.entries.iter().map(|e| e.value.clone()).collect();
    values.sort();
    values
}
