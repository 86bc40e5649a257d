//! # Vesta — Dynamo-style replicated key-value store
//!
//! Vesta is the core of an eventually-consistent, replicated key-value
//! store in the Dynamo mold:
//!
//! - **Multi-version values** — every value carries a vector clock; stale
//!   writes are rejected, concurrent writes coexist as siblings
//! - **Quorum reads and writes** — any node coordinates; `Put` replicates
//!   to W nodes, `Get` merges the causal frontier across R nodes
//! - **Explicit anti-entropy** — client-triggered gossip pushes a node's
//!   whole store to its peers
//! - **Crash simulation** — nodes can be administratively crashed and
//!   restored without losing in-memory state
//!
//! ## Quick start
//!
//! ```ignore
//! use vesta_kv::{cluster, ClusterConfig, PutArgs};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Boot a 3-node cluster with R = W = 2 on ports 8080..8082.
//!     let cluster = cluster::launch(&ClusterConfig::new(8080, 2, 2, 3)).await?;
//!
//!     let mut client = cluster.client(0);
//!     client.put(PutArgs::fresh("greeting", b"hello".to_vec())).await;
//!
//!     let result = client.get("greeting").await.unwrap();
//!     for entry in &result.entries {
//!         println!("{:?} -> {:?}", entry.context.clock, entry.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Control flow per request: RPC dispatch → crash gate → store or
//! coordinator. The coordinator fans out to peer clients, each of which
//! terminates at the remote node's *store* (`PutRaw`/`GetRaw`), never its
//! coordinator, so replication cannot recurse.
//!
//! - [`clock`] — vector clocks and causal contexts
//! - [`store`] — per-key multi-version storage with two-tier locking
//! - [`crash`] — the crash-deadline gate
//! - [`protocol`] — length-prefixed JSON over TCP
//! - [`client`] — outbound peer stub (failures are falsy, never fatal)
//! - [`node`] — quorum coordinator and RPC surface
//! - [`cluster`] — fixed-size cluster bootstrap

pub mod client;
pub mod clock;
pub mod cluster;
pub mod crash;
pub mod error;
pub mod node;
pub mod protocol;
pub mod store;
pub mod types;

// Public API exports
pub use clock::{Context, VectorClock};
pub use client::PeerClient;
pub use cluster::{Cluster, ClusterConfig};
pub use error::{VestaError, VestaResult};
pub use node::{NodeConfig, VestaNode};
pub use store::{VersionedStore, WriteOutcome};
pub use types::{GetResult, NodeAddr, ObjectEntry, PutArgs};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::PeerClient;
    pub use crate::clock::{Context, VectorClock};
    pub use crate::cluster::{Cluster, ClusterConfig};
    pub use crate::error::{VestaError, VestaResult};
    pub use crate::node::{NodeConfig, VestaNode};
    pub use crate::types::{GetResult, NodeAddr, ObjectEntry, PutArgs};
}

/// Initialize the logging system.
///
/// Call once at application startup. The log level is controlled via the
/// `VESTA_LOG` environment variable (`error`, `warn`, `info`, `debug`,
/// `trace`); the default is `info`.
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("VESTA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
