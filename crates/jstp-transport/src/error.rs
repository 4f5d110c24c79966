use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors that can occur at the transport layer, below the protocol.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// A record-format packet could not be framed or parsed off the wire.
    #[error("framing error: {0}")]
    Framing(String),

    /// The transport was already closed.
    #[error("transport closed")]
    Closed,

    /// An underlying I/O error occurred.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
