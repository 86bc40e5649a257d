/// Wire protocol for node-to-node and client-to-node communication.
///
/// Vesta uses a simple request-response protocol over TCP. Each message is
/// prefixed with a 4-byte big-endian length header followed by a
/// JSON-encoded payload.
///
/// # Thread safety
///
/// All network operations are async and designed for Tokio's
/// multi-threaded runtime. A [`Connection`] is owned by one caller at a
/// time; sharing happens above this layer.
use crate::error::{VestaError, VestaResult};
use crate::types::{GetResult, NodeAddr, PutArgs};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Maximum message size (16 MB).
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Requests a node accepts.
///
/// Everything except `ForceCrash` and `ForceRestore` is refused while the
/// node's crash deadline is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Coordinated write: increment the coordinator's clock component,
    /// apply locally, replicate to the first W-1 reachable peers.
    Put(PutArgs),
    /// Local write with the context exactly as supplied; used for
    /// replication and gossip so clocks never advance twice.
    PutRaw(PutArgs),
    /// Coordinated read merging the first R reachable replicas.
    Get { key: String },
    /// Local read of this node's entries only.
    GetRaw { key: String },
    /// Push every local (key, entry) pair to every peer.
    Gossip,
    /// Refuse gated operations for the next `seconds` seconds.
    Crash { seconds: u64 },
    /// Refuse gated operations until restored.
    ForceCrash,
    /// Clear the crash deadline.
    ForceRestore,
    /// Replace the node's preference list wholesale.
    SendPreferenceList { nodes: Vec<NodeAddr> },
}

/// Responses a node produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Operation completed with no payload.
    Ack,
    /// Boolean result of `Put`, `PutRaw`, or `Crash`.
    Written(bool),
    /// Entry list from `Get` or `GetRaw`.
    Entries(GetResult),
    /// The node refused or failed the request.
    Error { message: String },
}

fn to_bytes<T: Serialize>(message: &T) -> VestaResult<Vec<u8>> {
    serde_json::to_vec(message).map_err(VestaError::Serialization)
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> VestaResult<T> {
    serde_json::from_slice(bytes).map_err(VestaError::Serialization)
}

/// Network connection to a peer.
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl Connection {
    /// Wrap an accepted TCP stream.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self { stream, peer_addr }
    }

    /// Connect to a peer.
    pub async fn connect(addr: &str) -> VestaResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| VestaError::Transport(format!("failed to connect to {}: {}", addr, e)))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| VestaError::Transport(format!("failed to get peer address: {}", e)))?;
        Ok(Self::new(stream, peer_addr))
    }

    /// The remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Send one length-prefixed message.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> VestaResult<()> {
        let bytes = to_bytes(message)?;

        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(VestaError::Protocol(format!(
                "message too large: {} bytes (max: {})",
                bytes.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        let len = bytes.len() as u32;
        self.stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| VestaError::Transport(format!("failed to write message length: {}", e)))?;

        self.stream
            .write_all(&bytes)
            .await
            .map_err(|e| VestaError::Transport(format!("failed to write message body: {}", e)))?;

        self.stream
            .flush()
            .await
            .map_err(|e| VestaError::Transport(format!("failed to flush stream: {}", e)))?;

        Ok(())
    }

    /// Receive one length-prefixed message.
    pub async fn receive<T: DeserializeOwned>(&mut self) -> VestaResult<T> {
        let mut len_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| VestaError::Transport(format!("failed to read message length: {}", e)))?;

        let len = u32::from_be_bytes(len_bytes) as usize;

        if len > MAX_MESSAGE_SIZE {
            return Err(VestaError::Protocol(format!(
                "message too large: {} bytes (max: {})",
                len, MAX_MESSAGE_SIZE
            )));
        }

        let mut bytes = vec![0u8; len];
        self.stream
            .read_exact(&mut bytes)
            .await
            .map_err(|e| VestaError::Transport(format!("failed to read message body: {}", e)))?;

        from_bytes(&bytes)
    }

    /// Send a request and wait for the response.
    pub async fn request(&mut self, request: &Request) -> VestaResult<Response> {
        self.send(request).await?;
        self.receive().await
    }
}

/// TCP listener for incoming connections.
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to an address and start listening.
    pub async fn bind(addr: &str) -> VestaResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| VestaError::Transport(format!("failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| VestaError::Transport(format!("failed to get local address: {}", e)))?;

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept one incoming connection.
    pub async fn accept(&self) -> VestaResult<Connection> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| VestaError::Transport(format!("failed to accept connection: {}", e)))?;

        Ok(Connection::new(stream, peer_addr))
    }
}
