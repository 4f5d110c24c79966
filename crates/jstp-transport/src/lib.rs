//! # jstp-transport
//!
//! The transport contract consumed by the JSTP connection state machine
//! (§6 of the protocol spec), plus the event type transports use to push
//! parsed packets, closes, and errors back to their owner.
//!
//! Concrete transports (TCP, TLS, WebSocket) live in their own crates and
//! implement [`Transport`]; this crate has no networking code of its own.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod error;
mod events;
mod traits;

pub use error::{TransportError, TransportResult};
pub use events::TransportEvent;
pub use traits::Transport;
