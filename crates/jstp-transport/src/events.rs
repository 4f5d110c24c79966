use jstp_record::Value;

use crate::error::TransportError;

/// Events a [`crate::Transport`] pushes to its owner (typically a
/// `Connection`).
///
/// Framing — how a stream of bytes is cut into one `Packet` per logical
/// message — is transport-specific and lives entirely on the transport side
/// of this boundary: stream transports scan for a balanced top-level record,
/// WebSocket transports map one frame to one packet. By the time an event
/// reaches here the payload is already a parsed [`Value`].
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A complete packet was received and parsed.
    Packet(Value),
    /// The transport closed, cleanly or otherwise.
    Closed,
    /// The transport encountered an error outside of a single send/receive call.
    Error(TransportError),
}
