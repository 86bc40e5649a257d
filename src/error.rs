/// Error types for Vesta operations.
use thiserror::Error;

/// The main error type for Vesta operations.
///
/// Causal rejection of a stale write is not an error (see
/// [`WriteOutcome`](crate::store::WriteOutcome)), and an unreachable peer is
/// swallowed by the peer client rather than surfaced here; what remains are
/// the crash gate and the transport.
#[derive(Error, Debug)]
pub enum VestaError {
    /// The node is refusing requests while its crash deadline is active
    #[error("node is crashed")]
    Crashed,

    /// Wire-format encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Socket-level failure (connect, read, write)
    #[error("transport error: {0}")]
    Transport(String),

    /// Unexpected message for the current exchange
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for Vesta operations.
pub type VestaResult<T> = Result<T, VestaError>;
