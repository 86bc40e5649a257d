/// A Vesta node: local store, crash gate, and quorum coordinator.
///
/// Every node can coordinate any request. A coordinated `Put` increments
/// the node's own clock component and replicates with `PutRaw` down the
/// preference list; a coordinated `Get` merges `GetRaw` results from the
/// first R reachable replicas. Replication always terminates at the remote
/// node's store, never its coordinator, so fan-out cannot recurse.
///
/// # Locking
///
/// No store lock is ever held across an outbound call: the coordinator
/// snapshots what it needs (entries, keys, the preference list) and fans
/// out afterwards.
use crate::client::PeerClient;
use crate::crash::CrashGate;
use crate::error::VestaResult;
use crate::protocol::{Connection, Listener, Request, Response};
use crate::store::{VersionedStore, WriteOutcome};
use crate::types::{GetResult, NodeAddr, ObjectEntry, PutArgs};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

/// Static configuration for one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Stable id used as this node's axis in vector clocks.
    pub node_id: String,
    /// Address this node is reachable at (and listens on).
    pub addr: NodeAddr,
    /// W: successful writes required for a coordinated `Put`.
    pub write_quorum: usize,
    /// R: successful reads required for a coordinated `Get`.
    pub read_quorum: usize,
}

/// One node of the cluster.
pub struct VestaNode {
    node_id: String,
    self_addr: NodeAddr,
    write_quorum: usize,
    read_quorum: usize,
    store: VersionedStore,
    gate: CrashGate,
    /// Swapped wholesale by `SendPreferenceList`; coordinators clone the
    /// `Arc` so an in-flight operation keeps a stable snapshot.
    preference: RwLock<Arc<Vec<NodeAddr>>>,
}

impl VestaNode {
    /// Create a node with an empty store and an empty preference list.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            node_id: config.node_id,
            self_addr: config.addr,
            write_quorum: config.write_quorum,
            read_quorum: config.read_quorum,
            store: VersionedStore::new(),
            gate: CrashGate::new(),
            preference: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// This node's id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// This node's address.
    pub fn addr(&self) -> &NodeAddr {
        &self.self_addr
    }

    /// Current preference list snapshot.
    pub async fn preference_list(&self) -> Arc<Vec<NodeAddr>> {
        Arc::clone(&*self.preference.read().await)
    }

    /// Coordinated write.
    ///
    /// Increments this node's component of the supplied context, applies
    /// locally (always one write toward W, whether the local store applied
    /// or already dominated the version), then replicates the incremented
    /// context with `PutRaw` down the preference list, skipping self,
    /// stopping once W writes succeeded. Peers that fail are skipped and
    /// never rolled back; returns whether W was reached.
    pub async fn put(&self, mut args: PutArgs) -> VestaResult<bool> {
        self.gate.check().await?;

        args.context.clock.increment(&self.node_id);

        let outcome = self
            .store
            .put_raw(&args.key, args.context.clock.clone(), args.value.clone())
            .await;
        if outcome == WriteOutcome::Obsolete {
            trace!(key = %args.key, "local apply dominated by stored version");
        }

        let mut writes = 1;
        let preference = self.preference_list().await;
        for peer in preference.iter() {
            if writes >= self.write_quorum {
                break;
            }
            if *peer == self.self_addr {
                continue;
            }

            let mut client = PeerClient::new(peer.clone());
            if client.put_raw(args.clone()).await {
                writes += 1;
            } else {
                debug!(peer = %peer, key = %args.key, "replica write skipped");
            }
            client.close();
        }

        Ok(writes >= self.write_quorum)
    }

    /// Local write with the context exactly as supplied.
    ///
    /// A version that is an ancestor of (or equal to) a stored entry is a
    /// no-op but still reports `true`: the value is already present or
    /// dominated here, which is what the caller wanted.
    pub async fn put_raw(&self, args: PutArgs) -> VestaResult<bool> {
        self.gate.check().await?;

        self.store
            .put_raw(&args.key, args.context.clock, args.value)
            .await;
        Ok(true)
    }

    /// Coordinated read.
    ///
    /// Seeds the result from the local store (one read toward R), then
    /// merges `GetRaw` results from peers in preference-list order until R
    /// replicas contributed. Returns the merged causal frontier; if fewer
    /// than R replicas were reachable the partial merge is returned as-is.
    pub async fn get(&self, key: &str) -> VestaResult<GetResult> {
        self.gate.check().await?;

        let mut entries = self.store.get_raw(key).await;

        let mut reads = 1;
        let preference = self.preference_list().await;
        for peer in preference.iter() {
            if reads >= self.read_quorum {
                break;
            }
            if *peer == self.self_addr {
                continue;
            }

            let mut client = PeerClient::new(peer.clone());
            match client.get_raw(key).await {
                Some(remote) => {
                    reads += 1;
                    merge_entries(&mut entries, remote.entries);
                }
                None => debug!(peer = %peer, key, "replica read skipped"),
            }
            client.close();
        }

        Ok(GetResult::new(entries))
    }

    /// Local read of this node's entries only.
    pub async fn get_raw(&self, key: &str) -> VestaResult<GetResult> {
        self.gate.check().await?;

        Ok(GetResult::new(self.store.get_raw(key).await))
    }

    /// Push every local (key, entry) pair to every peer with `PutRaw`.
    ///
    /// One client per peer is reused across keys. Entries are snapshotted
    /// per key before any outbound call, so no store lock is held while
    /// talking to peers. Failures are logged and ignored; gossip never
    /// advances clocks.
    pub async fn gossip(&self) -> VestaResult<()> {
        self.gate.check().await?;

        let preference = self.preference_list().await;
        let mut clients: HashMap<NodeAddr, PeerClient> = HashMap::new();

        for key in self.store.keys() {
            let entries = self.store.get_raw(&key).await;

            for peer in preference.iter() {
                if *peer == self.self_addr {
                    continue;
                }

                let client = clients
                    .entry(peer.clone())
                    .or_insert_with(|| PeerClient::new(peer.clone()));

                for entry in &entries {
                    let args = PutArgs::from_entry(&key, entry.clone());
                    if !client.put_raw(args).await {
                        debug!(peer = %peer, key = %key, "gossip push failed");
                    }
                }
            }
        }

        for client in clients.values_mut() {
            client.close();
        }

        Ok(())
    }

    /// Make the node unavailable for `seconds`. Fails while already
    /// crashed, without extending the active deadline.
    pub async fn crash(&self, seconds: u64) -> VestaResult<bool> {
        self.gate.crash(seconds).await?;
        Ok(true)
    }

    /// Make the node unavailable until restored. Reachable in any state.
    pub async fn force_crash(&self) {
        self.gate.force_crash().await;
    }

    /// Restore the node; stored data is preserved. Reachable in any state.
    pub async fn force_restore(&self) {
        self.gate.force_restore().await;
    }

    /// Replace the preference list wholesale.
    pub async fn set_preference_list(&self, nodes: Vec<NodeAddr>) -> VestaResult<()> {
        self.gate.check().await?;

        let mut preference = self.preference.write().await;
        *preference = Arc::new(nodes);
        Ok(())
    }

    /// Translate one request into a response.
    ///
    /// This is the whole RPC surface; gating happens inside the operations
    /// themselves, and any error becomes [`Response::Error`] on the wire.
    pub async fn dispatch(&self, request: Request) -> Response {
        let result = match request {
            Request::Put(args) => self.put(args).await.map(Response::Written),
            Request::PutRaw(args) => self.put_raw(args).await.map(Response::Written),
            Request::Get { key } => self.get(&key).await.map(Response::Entries),
            Request::GetRaw { key } => self.get_raw(&key).await.map(Response::Entries),
            Request::Gossip => self.gossip().await.map(|()| Response::Ack),
            Request::Crash { seconds } => self.crash(seconds).await.map(Response::Written),
            Request::ForceCrash => {
                self.force_crash().await;
                Ok(Response::Ack)
            }
            Request::ForceRestore => {
                self.force_restore().await;
                Ok(Response::Ack)
            }
            Request::SendPreferenceList { nodes } => {
                self.set_preference_list(nodes).await.map(|()| Response::Ack)
            }
        };

        result.unwrap_or_else(|e| Response::Error {
            message: e.to_string(),
        })
    }

    /// Accept loop: one task per inbound connection.
    pub async fn serve(self: Arc<Self>, listener: Listener) -> VestaResult<()> {
        info!(node = %self.node_id, addr = %listener.local_addr(), "node listening");

        loop {
            let conn = listener.accept().await?;
            let node = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = node.handle_connection(conn).await {
                    debug!(error = %e, "connection closed");
                }
            });
        }
    }

    /// Serve one connection until the client hangs up.
    async fn handle_connection(self: Arc<Self>, mut conn: Connection) -> VestaResult<()> {
        loop {
            let request: Request = match conn.receive().await {
                Ok(request) => request,
                Err(_) => break, // connection closed
            };

            let response = self.dispatch(request).await;
            conn.send(&response).await?;
        }

        Ok(())
    }
}

/// Merge remote entries into a result set, keeping only the causal
/// frontier.
///
/// A local entry strictly dominated by a remote entry is dropped; a remote
/// entry is kept only while it stays concurrent with every remaining local
/// entry (an entry it equals, or that dominates it, wins).
fn merge_entries(entries: &mut Vec<ObjectEntry>, remote: Vec<ObjectEntry>) {
    for remote_entry in remote {
        let mut keep = true;

        entries.retain(|local| {
            if local.context.clock.less_than(&remote_entry.context.clock) {
                return false;
            }
            if !remote_entry.context.clock.concurrent(&local.context.clock) {
                keep = false;
            }
            true
        });

        if keep {
            entries.push(remote_entry);
        }
    }
}
