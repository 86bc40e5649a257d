/// Outbound peer client.
///
/// A thin, typed wrapper around one [`Connection`]. The coordinator creates
/// one per peer per operation (gossip caches one per peer for its duration)
/// and treats every failure as "peer unavailable": methods return `false`
/// or `None` instead of erroring, and a broken connection is dropped so the
/// next call reconnects.
use crate::error::VestaResult;
use crate::protocol::{Connection, Request, Response};
use crate::types::{GetResult, NodeAddr, PutArgs};
use tracing::debug;

/// Connection attempts per call before giving up. No backoff; the callers
/// tolerate coarse timing.
const CONNECT_RETRY_MAX: usize = 3;

/// Client for one remote node.
pub struct PeerClient {
    addr: NodeAddr,
    conn: Option<Connection>,
}

impl PeerClient {
    /// Create a client for `addr` without connecting yet.
    pub fn new(addr: NodeAddr) -> Self {
        Self { addr, conn: None }
    }

    /// The address this client talks to.
    pub fn addr(&self) -> &NodeAddr {
        &self.addr
    }

    /// Establish the connection if there is none, retrying a bounded number
    /// of times.
    pub async fn connect(&mut self) -> VestaResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let target = self.addr.to_string();
        let mut last_err = None;
        for _ in 0..CONNECT_RETRY_MAX {
            match Connection::connect(&target).await {
                Ok(conn) => {
                    self.conn = Some(conn);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.expect("retry loop ran at least once"))
    }

    /// Drop the current connection and establish a fresh one.
    pub async fn reconnect(&mut self) -> VestaResult<()> {
        self.conn = None;
        self.connect().await
    }

    /// Drop the connection, if any.
    pub fn close(&mut self) {
        self.conn = None;
    }

    /// Perform one request-response exchange.
    ///
    /// Any failure (connect, transport, or an error response from the node)
    /// yields `None`; the connection is dropped on transport failure so a
    /// later call starts clean.
    async fn call(&mut self, request: Request) -> Option<Response> {
        if let Err(e) = self.connect().await {
            debug!(peer = %self.addr, error = %e, "peer unreachable");
            return None;
        }

        let conn = self.conn.as_mut().expect("connected above");
        match conn.request(&request).await {
            Ok(Response::Error { message }) => {
                debug!(peer = %self.addr, %message, "peer refused request");
                None
            }
            Ok(response) => Some(response),
            Err(e) => {
                debug!(peer = %self.addr, error = %e, "peer call failed");
                self.conn = None;
                None
            }
        }
    }

    /// Coordinated write through the remote node. True iff the remote
    /// coordinator reached its write quorum.
    pub async fn put(&mut self, args: PutArgs) -> bool {
        matches!(self.call(Request::Put(args)).await, Some(Response::Written(ok)) if ok)
    }

    /// Replicate a value to the remote node without advancing clocks.
    pub async fn put_raw(&mut self, args: PutArgs) -> bool {
        matches!(self.call(Request::PutRaw(args)).await, Some(Response::Written(ok)) if ok)
    }

    /// Coordinated read through the remote node. `None` when the node is
    /// unreachable or crashed.
    pub async fn get(&mut self, key: &str) -> Option<GetResult> {
        match self.call(Request::Get { key: key.to_string() }).await {
            Some(Response::Entries(result)) => Some(result),
            _ => None,
        }
    }

    /// Read the remote node's local entries only.
    pub async fn get_raw(&mut self, key: &str) -> Option<GetResult> {
        match self.call(Request::GetRaw { key: key.to_string() }).await {
            Some(Response::Entries(result)) => Some(result),
            _ => None,
        }
    }

    /// Ask the remote node to gossip its whole store to its peers.
    pub async fn gossip(&mut self) -> bool {
        matches!(self.call(Request::Gossip).await, Some(Response::Ack))
    }

    /// Crash the remote node for `seconds`. False while it is already
    /// crashed (the active deadline is not extended).
    pub async fn crash(&mut self, seconds: u64) -> bool {
        matches!(self.call(Request::Crash { seconds }).await, Some(Response::Written(ok)) if ok)
    }

    /// Crash the remote node until restored.
    pub async fn force_crash(&mut self) -> bool {
        matches!(self.call(Request::ForceCrash).await, Some(Response::Ack))
    }

    /// Restore the remote node from a crash.
    pub async fn force_restore(&mut self) -> bool {
        matches!(self.call(Request::ForceRestore).await, Some(Response::Ack))
    }

    /// Replace the remote node's preference list.
    pub async fn send_preference_list(&mut self, nodes: Vec<NodeAddr>) -> bool {
        matches!(
            self.call(Request::SendPreferenceList { nodes }).await,
            Some(Response::Ack)
        )
    }
}
