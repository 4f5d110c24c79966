use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportResult;
use crate::events::TransportEvent;

/// The transport contract the protocol engine depends on (§6 of the
/// protocol spec): a byte-stream or framed-message channel that can send
/// one complete packet's serialized text at a time and that pushes parsed
/// packets, closes, and errors back as [`TransportEvent`]s.
///
/// Implementations own their framing (balanced-record scanning for raw TCP,
/// one-frame-per-packet for WebSocket) and are responsible for calling
/// [`Transport::events`] exactly once per transport instance — it hands
/// over the receiving end of an mpsc channel, so a second call returns
/// `None`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Transmits one complete packet's serialized text as a single logical
    /// message, preserving message boundaries.
    async fn send(&self, data: String) -> TransportResult<()>;

    /// Optionally transmits a final packet, then closes the transport.
    async fn end(&self, data: Option<String>) -> TransportResult<()>;

    /// The remote peer's address, for diagnostics.
    fn remote_address(&self) -> &str;

    /// Takes ownership of this transport's event receiver. Returns `None`
    /// if already taken.
    fn take_events(&self) -> Option<mpsc::Receiver<TransportEvent>>;
}
