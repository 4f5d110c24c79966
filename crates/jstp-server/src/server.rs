use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use jstp_protocol::{
    Application, ApplicationRegistry, Connection, ConnectionConfig, ConnectionId, RemoteError, ServerContext,
    SessionGrant,
};
use jstp_record::Value;
use jstp_transport::Transport;

use crate::auth::{AuthPolicy, DefaultAuthPolicy};
use crate::listeners::ListenerTable;

/// A running JSTP server (§4.5): owns the application registry and the
/// auth policy, and turns accepted transports into server-role
/// [`Connection`]s. Transport-agnostic — a hosting binary pairs this with
/// `jstp-tcp`'s listener, or any other `Transport` source.
pub struct Server {
    applications: ApplicationRegistry,
    auth: Arc<dyn AuthPolicy>,
    connections: DashMap<ConnectionId, Arc<Connection>>,
    connection_config: ConnectionConfig,
    connect_listeners: ListenerTable<Arc<Connection>>,
    disconnect_listeners: ListenerTable<Arc<Connection>>,
}

impl Server {
    /// Starts building a server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Wraps `transport` in a new server-role connection, registers it in
    /// the live connection set, and returns it. The caller is responsible
    /// for obtaining `transport` (typically from a `jstp-tcp` listener).
    pub fn accept(self: &Arc<Self>, transport: Arc<dyn Transport>) -> Arc<Connection> {
        let connection = Connection::new_server(transport, self.clone(), self.connection_config.clone());
        self.connections.insert(connection.id(), connection.clone());
        connection
    }

    /// A live snapshot of currently-open connections (§4.5
    /// `getClientsArray`). No ordering guarantee.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|entry| entry.value().clone()).collect()
    }

    /// The number of connections currently tracked, open or mid-handshake.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Registers a listener invoked when a session completes successfully.
    pub fn on_connect(&self, listener: impl Fn(Arc<Connection>) + Send + Sync + 'static) {
        self.connect_listeners.add(listener);
    }

    /// Registers a listener invoked when a previously connected session closes.
    pub fn on_disconnect(&self, listener: impl Fn(Arc<Connection>) + Send + Sync + 'static) {
        self.disconnect_listeners.add(listener);
    }
}

#[async_trait]
impl ServerContext for Server {
    fn application(&self, name: &str) -> Option<Arc<Application>> {
        self.applications.get(name)
    }

    async fn start_session(
        &self,
        _connection: &Arc<Connection>,
        _application: &Application,
        strategy: &str,
        credentials: Vec<Value>,
    ) -> Result<SessionGrant, RemoteError> {
        self.auth.start_session(strategy, credentials).await
    }

    fn emit_connect(&self, connection: Arc<Connection>) {
        self.connect_listeners.emit(connection);
    }

    fn emit_disconnect(&self, connection: Arc<Connection>) {
        self.connections.remove(&connection.id());
        self.disconnect_listeners.emit(connection);
    }
}

/// Builder for a [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    applications: Vec<Application>,
    auth: Option<Arc<dyn AuthPolicy>>,
    connection_config: ConnectionConfig,
}

impl ServerBuilder {
    /// Registers an application the server will accept handshakes for.
    pub fn application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    /// Overrides the default auth policy.
    pub fn auth_policy(mut self, auth: Arc<dyn AuthPolicy>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Overrides the per-connection configuration (heartbeat interval,
    /// pending-callback cap) new connections are built with.
    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Finishes the server.
    pub fn build(self) -> Arc<Server> {
        Arc::new(Server {
            applications: ApplicationRegistry::new(self.applications),
            auth: self.auth.unwrap_or_else(|| Arc::new(DefaultAuthPolicy::default())),
            connections: DashMap::new(),
            connection_config: self.connection_config,
            connect_listeners: ListenerTable::new(),
            disconnect_listeners: ListenerTable::new(),
        })
    }
}
