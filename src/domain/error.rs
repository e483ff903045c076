use thiserror::Error;

/// Failures reported by the transport collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("peer {0} is not known to the transport")]
    UnknownPeer(String),
    #[error("connect to {peer} failed: {reason}")]
    ConnectFailed { peer: String, reason: String },
    #[error("channel discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("not connected to {0}")]
    NotConnected(String),
    #[error("write to channel {channel} failed: {reason}")]
    WriteFailed { channel: String, reason: String },
    #[error("radio unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by the geocoding collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("reverse lookup failed: {0}")]
    Failed(String),
    #[error("reverse lookup timed out")]
    Timeout,
}

/// Errors surfaced by the link session
#[derive(Debug, Error)]
pub enum LinkError {
    /// Connect or capability discovery failed; retried once with backoff
    #[error("transient connection error: {0}")]
    TransientConnection(#[from] TransportError),
    /// The peer exposes no writable channel
    #[error("no writable channel on peer {0}")]
    CapabilityNotFound(String),
    /// The reading could not be encoded; the tick is skipped
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("link session is not running")]
    Closed,
}
