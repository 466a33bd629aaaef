//! Error types for discovery and verification.

use std::time::Duration;

use thiserror::Error;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A VarInt ran past five bytes without terminating.
    #[error("malformed VarInt: more than 5 bytes")]
    MalformedVarInt,

    /// The peer closed the stream in the middle of a VarInt.
    #[error("stream closed before VarInt terminated")]
    StreamClosed,

    /// The peer closed the stream before a fixed-size read completed.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid status payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The payload parsed but lacks `description` or `players`.
    #[error("status payload is missing `{0}`")]
    MissingField(&'static str),

    #[error("status payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The owning process exited or could not be inspected.
    #[error("process {pid} unavailable")]
    ProcessUnavailable { pid: u32 },

    #[error("socket table unavailable: {0}")]
    SocketTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
