//! Error types for `AgenStock` core library.

use thiserror::Error;

use crate::conversation::EntryRef;

/// Result type alias using `AgenStock` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `AgenStock` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be established.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A send was attempted while the transport is not open.
    #[error("Not connected to chat service")]
    NotConnected,

    /// An inbound frame failed structural parsing.
    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    /// A conversation reference no longer points at a live, streaming entry.
    #[error("Invalid conversation target: {0}")]
    InvalidTarget(EntryRef),

    /// A submit arrived while a reply is still pending.
    #[error("A reply is still in progress")]
    TurnInProgress,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
