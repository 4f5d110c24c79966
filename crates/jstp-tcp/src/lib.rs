//! A raw-TCP [`jstp_transport::Transport`] implementation.
//!
//! Framing is balanced-record scanning rather than newline- or
//! length-delimited: a JSTP packet is exactly one top-level `{...}` record,
//! so the codec tracks brace depth (skipping over quoted strings and
//! comments) instead of looking for a terminator byte.

mod codec;
mod transport;

pub use codec::RecordCodec;
pub use transport::{connect, TcpListener, TcpTransport};
