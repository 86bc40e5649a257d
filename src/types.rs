/// Common wire and storage types.
///
/// These are the plain data shapes shared by the store, the coordinator,
/// and the RPC surface: node addresses, versioned object entries, and the
/// argument/result records for `Put` and `Get`.
use crate::clock::{Context, VectorClock};
use serde::{Deserialize, Serialize};

/// Address of a node in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddr {
    /// Hostname or IP the node listens on.
    pub address: String,
    /// TCP port the node listens on.
    pub port: u16,
}

impl NodeAddr {
    /// Create a new node address.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl std::fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A single stored version: an opaque byte payload plus its causal context.
///
/// The store never interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Causal context the value was written under.
    pub context: Context,
    /// Opaque payload.
    pub value: Vec<u8>,
}

impl ObjectEntry {
    /// Create a new entry.
    pub fn new(context: Context, value: Vec<u8>) -> Self {
        Self { context, value }
    }
}

/// Arguments for a `Put` or `PutRaw` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutArgs {
    /// The key to write.
    pub key: String,
    /// Causal context supplied by the client.
    pub context: Context,
    /// Opaque payload.
    pub value: Vec<u8>,
}

impl PutArgs {
    /// Create put arguments from their parts.
    pub fn new(key: impl Into<String>, context: Context, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            context,
            value,
        }
    }

    /// Put arguments with a fresh (empty) causal context.
    ///
    /// This is what a client sends when it writes a key it has never read.
    pub fn fresh(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, Context::new(VectorClock::new()), value.into())
    }

    /// Put arguments reusing the context of an entry read earlier.
    ///
    /// This is the read-modify-write path: fetch, pick or combine contexts,
    /// write back under the observed causality.
    pub fn from_entry(key: impl Into<String>, entry: ObjectEntry) -> Self {
        Self::new(key, entry.context, entry.value)
    }
}

/// Result of a `Get` or `GetRaw`: the causal frontier for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResult {
    /// Pairwise concurrent entries for the key; empty if the key is absent.
    pub entries: Vec<ObjectEntry>,
}

impl GetResult {
    /// Wrap a list of entries.
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        Self { entries }
    }

    /// The entry values, in entry order.
    pub fn values(&self) -> Vec<&[u8]> {
        self.entries.iter().map(|e| e.value.as_slice()).collect()
    }
}

/// Rotate a preference list one position to the left.
///
/// The cluster bootstrap applies this once per node so that node `i`'s
/// preference list begins at node `i`.
pub fn rotate_left(nodes: &[NodeAddr]) -> Vec<NodeAddr> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut rotated = Vec::with_capacity(nodes.len());
    rotated.extend_from_slice(&nodes[1..]);
    rotated.push(nodes[0].clone());
    rotated
}
