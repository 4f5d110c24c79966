//! The JSTP protocol engine: packet parsing and construction, the error
//! model, the connection state machine, the application registry, and the
//! client-side remote proxy and connect policy.
//!
//! This crate is transport-agnostic — it depends on [`jstp_transport`]'s
//! `Transport` trait, not on any concrete socket implementation — and
//! server-agnostic in the same way, through the [`ServerContext`] trait a
//! hosting crate implements.

mod application;
mod connection;
mod error;
mod packet;
mod policy;
mod remote_proxy;
mod server_context;

pub use application::{handler, Application, ApplicationBuilder, ApplicationRegistry, Handler, HandlerResult, Interface, InterfaceBuilder};
pub use connection::{Connection, ConnectionConfig, ConnectionId, ConnectionState, EventNotice};
pub use error::{CallError, ErrorKind, ProtocolError, RemoteError};
pub use packet::{build, HandshakeVerb, Header, Outcome, Packet};
pub use policy::{AnonymousConnect, ConnectPolicy, HandshakeArgs, LoginConnect};
pub use remote_proxy::RemoteProxy;
pub use server_context::{ServerContext, SessionGrant};
