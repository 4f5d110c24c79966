//! The JSTP server: accepts transports, owns the application registry, and
//! delegates authentication to a pluggable [`AuthPolicy`] (§4.5, §4.6).
//!
//! Binding a socket and listening for incoming connections is outside this
//! crate's scope — that's `jstp-tcp`'s job. A `Server` here only knows how
//! to turn an already-established [`jstp_transport::Transport`] into a
//! server-role [`jstp_protocol::Connection`].

mod auth;
mod config;
mod error;
mod listeners;
mod server;

pub use auth::{AuthPolicy, CredentialStore, DefaultAuthPolicy, InMemoryCredentialStore};
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{Server, ServerBuilder};
