//! JSTP: a bidirectional RPC protocol engine over pluggable transports.
//!
//! This crate is a facade over the underlying building blocks — `jstp-record`
//! for the wire format, `jstp-protocol` for the packet model and connection
//! state machine, `jstp-server` for server-side acceptance and auth, and
//! `jstp-tcp` for the TCP transport. Most applications only need `use
//! jstp::prelude::*;`.

pub use jstp_protocol::{
    handler, Application, ApplicationBuilder, ApplicationRegistry, AnonymousConnect, CallError,
    Connection, ConnectionConfig, ConnectionId, ConnectionState, ConnectPolicy, ErrorKind,
    EventNotice, HandshakeArgs, Handler, HandlerResult, HandshakeVerb, Interface,
    InterfaceBuilder, LoginConnect, Outcome, Packet, ProtocolError, RemoteError, RemoteProxy,
    ServerContext, SessionGrant,
};

pub use jstp_server::{
    AuthPolicy, CredentialStore, DefaultAuthPolicy, InMemoryCredentialStore, Server,
    ServerBuilder, ServerConfig, ServerError,
};

pub use jstp_tcp::{connect, RecordCodec, TcpListener, TcpTransport};

pub use jstp_record::{parse, stringify, Record, Value};
pub use jstp_transport::{Transport, TransportError, TransportEvent, TransportResult};

// Re-exported for macro-free downstream convenience, the way a facade crate
// typically surfaces its core async-runtime and logging dependencies.
pub use async_trait;
pub use tokio;
pub use tracing;
pub use uuid;

/// Commonly used types, meant to be glob-imported.
pub mod prelude {
    pub use crate::{
        handler, AnonymousConnect, Application, ApplicationBuilder, ApplicationRegistry,
        AuthPolicy, CallError, Connection, ConnectionConfig, ConnectPolicy, DefaultAuthPolicy,
        ErrorKind, Handler, HandlerResult, Interface, InterfaceBuilder, LoginConnect, RemoteError,
        RemoteProxy, Server, ServerBuilder, ServerConfig,
    };
    pub use jstp_record::Value;
}

/// Installs a [`tracing_subscriber`] `fmt` subscriber configured from the
/// `RUST_LOG` environment variable, falling back to `filter` when unset.
///
/// Intended for binaries (the CLI, examples, tests) rather than library
/// code, which should never install a global subscriber on a caller's
/// behalf.
pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
