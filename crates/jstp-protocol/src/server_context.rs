use std::sync::Arc;

use async_trait::async_trait;
use jstp_record::Value;

use crate::application::Application;
use crate::connection::Connection;
use crate::error::RemoteError;

/// What a successful handshake grants (§4.6): an optional username and an
/// opaque, server-minted session id.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    /// The authenticated username, if the strategy produced one.
    pub username: Option<String>,
    /// The opaque session id sent back to the peer.
    pub session_id: Value,
}

/// The server-side hooks a [`Connection`] needs during the handshake
/// (§4.4, §4.5), expressed as a trait so `jstp-protocol` doesn't depend on
/// `jstp-server` (which depends on it). A server-role `Connection` holds an
/// `Arc<dyn ServerContext>`; a client-role one holds none — this is how the
/// "exactly one of client-context or server-context is attached" invariant
/// from §3 is enforced, through the type system rather than a runtime check.
#[async_trait]
pub trait ServerContext: Send + Sync {
    /// Resolves an application by name from the registry.
    fn application(&self, name: &str) -> Option<Arc<Application>>;

    /// Delegates to the configured auth policy (§4.6).
    async fn start_session(
        &self,
        connection: &Arc<Connection>,
        application: &Application,
        strategy: &str,
        credentials: Vec<Value>,
    ) -> Result<SessionGrant, RemoteError>;

    /// Called once a session completes successfully.
    fn emit_connect(&self, connection: Arc<Connection>);

    /// Called when the connection closes.
    fn emit_disconnect(&self, connection: Arc<Connection>);
}
