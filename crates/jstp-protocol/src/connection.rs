use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jstp_record::Value;
use jstp_transport::{Transport, TransportEvent};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::Application;
use crate::error::{CallError, ErrorKind, RemoteError};
use crate::packet::{build, HandshakeVerb, Header, Outcome, Packet};
use crate::remote_proxy::RemoteProxy;
use crate::server_context::ServerContext;

/// A process-unique, human-loggable connection identifier. Unrelated to the
/// wire-level packet ids exchanged over the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a [`Connection`] sits in the handshake lifecycle (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handshake packet has been exchanged yet.
    Fresh,
    /// A handshake request has been sent or received; awaiting the response.
    Handshaking,
    /// The handshake completed; calls, events, inspects and pings flow freely.
    Open,
    /// Terminal. Every pending callback has been failed exactly once.
    Closed,
}

/// Tunable knobs for a [`Connection`], carried separately from construction
/// arguments so callers can default most of them.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How often to send an empty heartbeat mapping, if at all.
    pub heartbeat_interval: Option<Duration>,
    /// Caps the number of callbacks a connection will track concurrently,
    /// guarding against unbounded growth from a peer that never replies.
    pub max_pending_callbacks: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: None,
            max_pending_callbacks: 10_000,
        }
    }
}

enum Role {
    Client,
    Server(Arc<dyn ServerContext>),
}

#[derive(Debug, Clone, Default)]
struct Session {
    username: Option<String>,
    session_id: Option<Value>,
}

/// What a resolved pending callback carries back to its waiter.
#[derive(Debug, Clone)]
enum Completion {
    Results(Vec<Value>),
    SessionId(Value),
    Pong,
}

type PendingSender = oneshot::Sender<Result<Completion, CallError>>;

/// An event packet, handed to listeners registered via
/// [`Connection::on_event`].
#[derive(Debug, Clone)]
pub struct EventNotice {
    /// The interface the event was addressed to.
    pub interface: String,
    /// The event's name.
    pub name: String,
    /// The event's argument sequence.
    pub args: Vec<Value>,
}

struct ListenerTable<T> {
    listeners: Mutex<Vec<Box<dyn Fn(T) + Send + Sync>>>,
}

impl<T: Clone> ListenerTable<T> {
    fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, listener: impl Fn(T) + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Invokes every listener in registration order.
    fn emit(&self, value: T) {
        for listener in self.listeners.lock().iter() {
            listener(value.clone());
        }
    }
}

/// A single JSTP connection: the state machine described by §3, §4.4, §5,
/// §7 and §8. Owns the transport, the pending-callback table, and (for a
/// server-role connection) the negotiated application and session.
///
/// Symmetric by design: both a client-role and a server-role connection can
/// issue [`Connection::call`], [`Connection::inspect`] and
/// [`Connection::ping`] once open, and both can receive them. Only the
/// handshake itself is role-specific.
pub struct Connection {
    id: ConnectionId,
    role: Role,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    next_id: AtomicI64,
    id_delta: i64,
    pending: Mutex<HashMap<i64, PendingSender>>,
    session: Mutex<Session>,
    local_application: Mutex<Option<Arc<Application>>>,
    connected: AtomicBool,
    event_listeners: ListenerTable<EventNotice>,
    packet_rejected_listeners: ListenerTable<Value>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    close_reason: Mutex<Option<String>>,
    max_pending_callbacks: usize,
    self_weak: std::sync::Weak<Connection>,
    /// Cached [`RemoteProxy`]s, keyed by interface name (§3). Populated by
    /// [`RemoteProxy::inspect`] so repeated inspects of the same interface
    /// return the proxy built the first time, per §4.4.
    remote_proxies: Mutex<HashMap<String, RemoteProxy>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("server", &self.is_server())
            .finish()
    }
}

impl Connection {
    fn new(role: Role, transport: Arc<dyn Transport>, config: ConnectionConfig) -> Arc<Self> {
        let id_delta = match &role {
            Role::Client => 1,
            Role::Server(_) => -1,
        };
        let connection = Arc::new_cyclic(|weak| Connection {
            id: ConnectionId::new(),
            role,
            transport,
            state: Mutex::new(ConnectionState::Fresh),
            next_id: AtomicI64::new(0),
            id_delta,
            pending: Mutex::new(HashMap::new()),
            session: Mutex::new(Session::default()),
            local_application: Mutex::new(None),
            connected: AtomicBool::new(false),
            event_listeners: ListenerTable::new(),
            packet_rejected_listeners: ListenerTable::new(),
            heartbeat: Mutex::new(None),
            receive_task: Mutex::new(None),
            close_reason: Mutex::new(None),
            max_pending_callbacks: config.max_pending_callbacks,
            self_weak: weak.clone(),
            remote_proxies: Mutex::new(HashMap::new()),
        });
        connection.spawn_receive_loop();
        if let Some(interval) = config.heartbeat_interval {
            connection.start_heartbeat(interval);
        }
        connection
    }

    /// Builds a client-role connection: no application registry, issues
    /// handshake requests, allocates non-negative ids.
    pub fn new_client(transport: Arc<dyn Transport>, config: ConnectionConfig) -> Arc<Self> {
        Self::new(Role::Client, transport, config)
    }

    /// Builds a server-role connection: accepts handshake requests against
    /// `context`'s application registry and auth policy, allocates
    /// non-positive ids.
    pub fn new_server(
        transport: Arc<dyn Transport>,
        context: Arc<dyn ServerContext>,
        config: ConnectionConfig,
    ) -> Arc<Self> {
        Self::new(Role::Server(context), transport, config)
    }

    fn arc(&self) -> Arc<Self> {
        self.self_weak
            .upgrade()
            .expect("connection dropped while still in use")
    }

    /// This connection's diagnostic identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// `true` if this connection accepted a handshake rather than sent one.
    pub fn is_server(&self) -> bool {
        matches!(self.role, Role::Server(_))
    }

    /// The connection's current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// `true` once the handshake has completed and normal traffic flows.
    pub fn is_handshake_done(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// The authenticated username, once the handshake has completed.
    pub fn username(&self) -> Option<String> {
        self.session.lock().username.clone()
    }

    /// The session id the server minted, once the handshake has completed.
    pub fn session_id(&self) -> Option<Value> {
        self.session.lock().session_id.clone()
    }

    /// The peer's address, for diagnostics.
    pub fn remote_address(&self) -> &str {
        self.transport.remote_address()
    }

    /// Why this connection closed, if it has.
    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().clone()
    }

    /// The application negotiated during the handshake (server role), or
    /// whatever an embedder attached for symmetric client-side dispatch.
    pub fn local_application(&self) -> Option<Arc<Application>> {
        self.local_application.lock().clone()
    }

    /// Attaches an application this connection will serve incoming calls
    /// and inspects against. Mainly useful on the client role, where a
    /// connection doesn't otherwise get one from a handshake.
    pub fn set_local_application(&self, application: Arc<Application>) {
        *self.local_application.lock() = Some(application);
    }

    /// Registers a listener invoked, in registration order, for every event
    /// packet this connection receives.
    pub fn on_event(&self, listener: impl Fn(EventNotice) + Send + Sync + 'static) {
        self.event_listeners.add(listener);
    }

    /// Registers a listener invoked whenever an inbound packet is rejected
    /// for want of a matching pending callback (§9).
    pub fn on_packet_rejected(&self, listener: impl Fn(Value) + Send + Sync + 'static) {
        self.packet_rejected_listeners.add(listener);
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) * self.id_delta
    }

    fn register_pending(&self, id: i64) -> Result<oneshot::Receiver<Result<Completion, CallError>>, CallError> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.max_pending_callbacks {
            return Err(CallError::TooManyPending);
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok(rx)
    }

    fn take_pending(&self, id: i64) -> Option<PendingSender> {
        self.pending.lock().remove(&id)
    }

    async fn send_raw(&self, value: Value) -> Result<(), CallError> {
        self.transport
            .send(jstp_record::stringify(&value))
            .await
            .map_err(|_| CallError::ConnectionClosed)
    }

    /// Sends a handshake request and awaits the server's response (§4.6).
    /// Only meaningful on a client-role connection; a server-role
    /// connection that calls this simply asks its peer to authenticate it
    /// in turn, which is legal under the protocol's symmetry but unusual.
    pub async fn handshake(&self, app: &str, strategy: &str, credentials: Vec<Value>) -> Result<Value, CallError> {
        let id = self.next_id();
        let rx = self.register_pending(id)?;
        self.set_state(ConnectionState::Handshaking);
        self.send_raw(build::handshake_request(id, app, strategy, credentials))
            .await?;
        match rx.await {
            Ok(Ok(Completion::SessionId(session_id))) => Ok(session_id),
            Ok(Ok(_)) => Err(CallError::ConnectionClosed),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CallError::ConnectionClosed),
        }
    }

    /// Issues a call and awaits its result sequence (§4.1).
    pub async fn call(&self, interface: &str, method: &str, args: Vec<Value>) -> Result<Vec<Value>, CallError> {
        let id = self.next_id();
        let rx = self.register_pending(id)?;
        self.send_raw(build::call(id, interface, method, args)).await?;
        match rx.await {
            Ok(Ok(Completion::Results(values))) => Ok(values),
            Ok(Ok(_)) => Err(CallError::ConnectionClosed),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CallError::ConnectionClosed),
        }
    }

    /// Asks the peer for an interface's method names (§4.1).
    pub async fn inspect(&self, interface: &str) -> Result<Vec<String>, CallError> {
        let id = self.next_id();
        let rx = self.register_pending(id)?;
        self.send_raw(build::inspect(id, interface)).await?;
        match rx.await {
            Ok(Ok(Completion::Results(values))) => Ok(values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()),
            Ok(Ok(_)) => Err(CallError::ConnectionClosed),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CallError::ConnectionClosed),
        }
    }

    /// Returns the cached proxy for `interface`, if one has already been
    /// built by [`RemoteProxy::inspect`] on this connection.
    pub(crate) fn cached_remote_proxy(&self, interface: &str) -> Option<RemoteProxy> {
        self.remote_proxies.lock().get(interface).cloned()
    }

    /// Caches `proxy` under its interface name, so subsequent inspects of
    /// the same interface reuse it instead of re-inspecting the peer.
    pub(crate) fn cache_remote_proxy(&self, proxy: RemoteProxy) {
        self.remote_proxies
            .lock()
            .entry(proxy.interface().to_string())
            .or_insert(proxy);
    }

    /// Sends a ping and waits for the matching pong (§4.1).
    pub async fn ping(&self) -> Result<(), CallError> {
        let id = self.next_id();
        let rx = self.register_pending(id)?;
        self.send_raw(build::ping(id)).await?;
        match rx.await {
            Ok(Ok(Completion::Pong)) => Ok(()),
            Ok(Ok(_)) => Err(CallError::ConnectionClosed),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CallError::ConnectionClosed),
        }
    }

    /// Fires an event at the peer. Fire-and-forget: there is no callback.
    pub async fn emit_event(&self, interface: &str, name: &str, args: Vec<Value>) -> Result<(), CallError> {
        let id = self.next_id();
        self.send_raw(build::event(id, interface, name, args)).await
    }

    /// Starts (or restarts) a periodic heartbeat, sending the empty mapping
    /// on `interval` until the connection closes.
    pub fn start_heartbeat(&self, interval: Duration) {
        self.stop_heartbeat();
        let conn = self.arc();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if conn.state() == ConnectionState::Closed {
                    break;
                }
                if conn.send_raw(build::heartbeat()).await.is_err() {
                    break;
                }
            }
        });
        *self.heartbeat.lock() = Some(handle);
    }

    /// Cancels a running heartbeat, if any.
    pub fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }
    }

    fn spawn_receive_loop(&self) {
        let Some(mut events) = self.transport.take_events() else {
            return;
        };
        let conn = self.arc();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Packet(value) => match Packet::parse(&value) {
                        Ok(packet) => conn.dispatch(packet).await,
                        Err(err) => {
                            conn.reject(value);
                            conn.close_fatal(err.to_string()).await;
                        }
                    },
                    TransportEvent::Closed => {
                        conn.finish_closed("transport closed".to_string()).await;
                        break;
                    }
                    TransportEvent::Error(err) => {
                        conn.finish_closed(err.to_string()).await;
                        break;
                    }
                }
                if conn.state() == ConnectionState::Closed {
                    break;
                }
            }
        });
        *self.receive_task.lock() = Some(handle);
    }

    async fn dispatch(&self, packet: Packet) {
        if matches!(packet, Packet::Heartbeat) {
            return;
        }
        if self.state() != ConnectionState::Open {
            match packet {
                Packet::Handshake { header, verb } => self.dispatch_handshake(header, verb).await,
                other => {
                    let reason = format!(
                        "received {} before the handshake completed",
                        packet_kind(&other)
                    );
                    self.reject(other.to_value());
                    self.close_fatal(reason).await;
                }
            }
            return;
        }

        if matches!(packet, Packet::Handshake { .. }) {
            self.reject(packet.to_value());
            self.close_fatal("received a second handshake packet".to_string()).await;
            return;
        }

        match packet {
            Packet::Handshake { .. } => unreachable!("handled above"),
            Packet::Call { header, method, args } => self.dispatch_call(header, method, args).await,
            Packet::Callback { header, outcome } => {
                self.resolve_or_reject(header.id, CallbackSignal::Outcome(outcome))
            }
            Packet::Event { header, name, args } => self.dispatch_event(header, name, args),
            Packet::Inspect { header } => self.dispatch_inspect(header).await,
            Packet::Ping { header } => self.dispatch_ping(header).await,
            Packet::Pong { header } => self.resolve_or_reject(header.id, CallbackSignal::Pong),
            Packet::Heartbeat => unreachable!("filtered above"),
        }
    }

    async fn dispatch_handshake(&self, header: Header, verb: HandshakeVerb) {
        match &self.role {
            Role::Client => self.handle_handshake_as_client(header, verb).await,
            Role::Server(_) => self.handle_handshake_as_server(header, verb).await,
        }
    }

    async fn handle_handshake_as_client(&self, header: Header, verb: HandshakeVerb) {
        match verb {
            HandshakeVerb::Request { .. } => {
                let err = RemoteError::new(ErrorKind::NotAServer);
                let _ = self.send_raw(build::handshake_error(header.id, &err)).await;
                self.close_fatal("received a handshake request while acting as a client".to_string())
                    .await;
            }
            HandshakeVerb::Ok { session_id } => match self.take_pending(header.id) {
                Some(tx) => {
                    *self.session.lock() = Session {
                        username: None,
                        session_id: Some(session_id.clone()),
                    };
                    self.set_state(ConnectionState::Open);
                    let _ = tx.send(Ok(Completion::SessionId(session_id)));
                }
                None => self.reject(build::handshake_ok(header.id, session_id)),
            },
            HandshakeVerb::Error(err) => match self.take_pending(header.id) {
                Some(tx) => {
                    let _ = tx.send(Err(CallError::Remote(err.clone())));
                    self.close_fatal(format!("handshake rejected: {err}")).await;
                }
                None => self.reject(build::handshake_error(header.id, &err)),
            },
        }
    }

    async fn handle_handshake_as_server(&self, header: Header, verb: HandshakeVerb) {
        let Role::Server(context) = &self.role else {
            unreachable!("dispatch_handshake only calls this for the server role")
        };
        let HandshakeVerb::Request { strategy, credentials } = verb else {
            self.close_fatal("server received a non-request handshake packet".to_string())
                .await;
            return;
        };
        let Some(app_name) = header.target.clone() else {
            self.close_fatal("handshake request missing application name".to_string())
                .await;
            return;
        };
        let Some(application) = context.application(&app_name) else {
            let err = RemoteError::with_message(ErrorKind::AppNotFound, format!("no such application '{app_name}'"));
            let _ = self.send_raw(build::handshake_error(header.id, &err)).await;
            self.close_fatal(format!("unknown application '{app_name}'")).await;
            return;
        };

        self.set_state(ConnectionState::Handshaking);
        match context.start_session(&self.arc(), &application, &strategy, credentials).await {
            Ok(grant) => {
                *self.local_application.lock() = Some(application);
                *self.session.lock() = Session {
                    username: grant.username,
                    session_id: Some(grant.session_id.clone()),
                };
                self.set_state(ConnectionState::Open);
                if self
                    .send_raw(build::handshake_ok(header.id, grant.session_id))
                    .await
                    .is_err()
                {
                    self.close_fatal("failed to send handshake response".to_string()).await;
                    return;
                }
                self.connected.store(true, Ordering::Relaxed);
                context.emit_connect(self.arc());
            }
            Err(_) => {
                let err = RemoteError::new(ErrorKind::AuthFailed);
                let _ = self.send_raw(build::handshake_error(header.id, &err)).await;
                self.close_fatal("authentication failed".to_string()).await;
            }
        }
    }

    async fn dispatch_call(&self, header: Header, method: String, args: Vec<Value>) {
        let interface = header.target.clone().unwrap_or_default();
        let application = self.local_application();
        let result = match application {
            Some(app) => app.call_method(self.arc(), &interface, &method, args).await,
            None => Err(RemoteError::new(ErrorKind::InterfaceNotFound)),
        };
        let reply = match result {
            Ok(values) => build::callback_ok(header.id, values),
            Err(err) => build::callback_error(header.id, &err),
        };
        if self.send_raw(reply).await.is_err() {
            self.close_fatal("failed to send call result".to_string()).await;
        }
    }

    fn dispatch_event(&self, header: Header, name: String, args: Vec<Value>) {
        let interface = header.target.clone().unwrap_or_default();
        self.event_listeners.emit(EventNotice { interface, name, args });
    }

    async fn dispatch_inspect(&self, header: Header) {
        let interface = header.target.clone().unwrap_or_default();
        let application = self.local_application();
        let reply = match application.as_deref().and_then(|app| app.get_methods(&interface)) {
            Some(methods) => build::callback_ok(header.id, methods.into_iter().map(Value::String).collect()),
            None => build::callback_error(header.id, &RemoteError::new(ErrorKind::InterfaceNotFound)),
        };
        if self.send_raw(reply).await.is_err() {
            self.close_fatal("failed to send inspect result".to_string()).await;
        }
    }

    async fn dispatch_ping(&self, header: Header) {
        if self.send_raw(build::pong(header.id)).await.is_err() {
            self.close_fatal("failed to send pong".to_string()).await;
        }
    }

    fn resolve_or_reject(&self, id: i64, signal: CallbackSignal) {
        let Some(tx) = self.take_pending(id) else {
            let raw = match &signal {
                CallbackSignal::Outcome(Outcome::Ok(values)) => build::callback_ok(id, values.clone()),
                CallbackSignal::Outcome(Outcome::Error(err)) => build::callback_error(id, err),
                CallbackSignal::Pong => build::pong(id),
            };
            self.reject(raw);
            return;
        };
        let outcome = match signal {
            CallbackSignal::Outcome(Outcome::Ok(values)) => Ok(Completion::Results(values)),
            CallbackSignal::Outcome(Outcome::Error(err)) => Err(CallError::Remote(err)),
            CallbackSignal::Pong => Ok(Completion::Pong),
        };
        let _ = tx.send(outcome);
    }

    fn reject(&self, raw: Value) {
        tracing::warn!(connection = %self.id, "rejecting packet");
        self.packet_rejected_listeners.emit(raw);
    }

    /// Closes the connection from the local side.
    pub async fn close(&self) {
        self.close_internal("closed locally".to_string()).await;
    }

    async fn close_fatal(&self, reason: String) {
        tracing::warn!(connection = %self.id, %reason, "closing connection: protocol violation");
        self.close_internal(reason).await;
    }

    async fn finish_closed(&self, reason: String) {
        self.close_internal(reason).await;
    }

    async fn close_internal(&self, reason: String) {
        let already_closed = {
            let mut state = self.state.lock();
            if *state == ConnectionState::Closed {
                true
            } else {
                *state = ConnectionState::Closed;
                false
            }
        };
        if already_closed {
            return;
        }
        *self.close_reason.lock() = Some(reason.clone());
        tracing::info!(connection = %self.id, %reason, "connection closed");
        self.stop_heartbeat();
        if let Some(handle) = self.receive_task.lock().take() {
            handle.abort();
        }
        let pending = std::mem::take(&mut *self.pending.lock());
        for (_, tx) in pending {
            let _ = tx.send(Err(CallError::ConnectionClosed));
        }
        let _ = self.transport.end(None).await;
        if let Role::Server(context) = &self.role {
            if self.connected.swap(false, Ordering::Relaxed) {
                context.emit_disconnect(self.arc());
            }
        }
    }
}

enum CallbackSignal {
    Outcome(Outcome),
    Pong,
}

fn packet_kind(packet: &Packet) -> &'static str {
    match packet {
        Packet::Heartbeat => "heartbeat",
        Packet::Handshake { .. } => "handshake",
        Packet::Call { .. } => "call",
        Packet::Callback { .. } => "callback",
        Packet::Event { .. } => "event",
        Packet::Inspect { .. } => "inspect",
        Packet::Ping { .. } => "ping",
        Packet::Pong { .. } => "pong",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind as Kind;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    pub(crate) struct FakeTransport {
        pub(crate) sent: StdMutex<Vec<String>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Arc<FakeTransport> {
            Arc::new(Self {
                sent: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, data: String) -> jstp_transport::TransportResult<()> {
            self.sent.lock().unwrap().push(data);
            Ok(())
        }

        async fn end(&self, _data: Option<String>) -> jstp_transport::TransportResult<()> {
            Ok(())
        }

        fn remote_address(&self) -> &str {
            "test"
        }

        fn take_events(&self) -> Option<mpsc::Receiver<TransportEvent>> {
            let (_tx, rx) = mpsc::channel(1);
            Some(rx)
        }
    }

    #[derive(Default)]
    struct RefusingServerContext;

    #[async_trait::async_trait]
    impl ServerContext for RefusingServerContext {
        fn application(&self, _name: &str) -> Option<Arc<Application>> {
            None
        }

        async fn start_session(
            &self,
            _connection: &Arc<Connection>,
            _application: &Application,
            _strategy: &str,
            _credentials: Vec<Value>,
        ) -> Result<crate::server_context::SessionGrant, RemoteError> {
            Err(RemoteError::new(Kind::AuthFailed))
        }

        fn emit_connect(&self, _connection: Arc<Connection>) {}
        fn emit_disconnect(&self, _connection: Arc<Connection>) {}
    }

    pub fn dummy_connection() -> Arc<Connection> {
        Connection::new_client(FakeTransport::new(), ConnectionConfig::default())
    }

    #[tokio::test]
    async fn client_ids_increase_from_zero() {
        let conn = dummy_connection();
        assert_eq!(conn.next_id(), 0);
        assert_eq!(conn.next_id(), 1);
        assert_eq!(conn.next_id(), 2);
    }

    #[tokio::test]
    async fn server_ids_decrease_from_zero() {
        let conn = Connection::new_server(
            FakeTransport::new(),
            Arc::new(RefusingServerContext),
            ConnectionConfig::default(),
        );
        assert_eq!(conn.next_id(), 0);
        assert_eq!(conn.next_id(), -1);
        assert_eq!(conn.next_id(), -2);
    }

    #[tokio::test]
    async fn ping_replies_with_pong() {
        let transport = FakeTransport::new();
        let conn = Connection::new_client(transport.clone(), ConnectionConfig::default());
        conn.set_state(ConnectionState::Open);
        conn.dispatch(Packet::Ping {
            header: Header { id: 7, target: None },
        })
        .await;
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("pong"));
    }

    #[tokio::test]
    async fn non_handshake_packet_before_handshake_closes_fatally() {
        let conn = dummy_connection();
        let rejected = Arc::new(StdMutex::new(Vec::new()));
        let rejected_clone = rejected.clone();
        conn.on_packet_rejected(move |value| rejected_clone.lock().unwrap().push(value));
        conn.dispatch(Packet::Ping {
            header: Header { id: 1, target: None },
        })
        .await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(rejected.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_handshake_packet_is_rejected_and_closes() {
        let conn = dummy_connection();
        conn.set_state(ConnectionState::Open);
        let rejected = Arc::new(StdMutex::new(Vec::new()));
        let rejected_clone = rejected.clone();
        conn.on_packet_rejected(move |value| rejected_clone.lock().unwrap().push(value));
        conn.dispatch(Packet::Handshake {
            header: Header { id: 0, target: Some("jstp".to_string()) },
            verb: HandshakeVerb::Ok { session_id: Value::Null },
        })
        .await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(rejected.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn close_fails_all_pending_callbacks_exactly_once() {
        let conn = dummy_connection();
        let rx = conn.register_pending(0).unwrap();
        conn.close().await;
        assert!(matches!(rx.await.unwrap(), Err(CallError::ConnectionClosed)));
        // Closing twice must not panic or double-fail anything.
        conn.close().await;
    }

    #[tokio::test]
    async fn register_pending_respects_the_configured_cap() {
        let conn = Connection::new_client(
            FakeTransport::new(),
            ConnectionConfig {
                heartbeat_interval: None,
                max_pending_callbacks: 1,
            },
        );
        let _first = conn.register_pending(100).unwrap();
        assert!(matches!(conn.register_pending(101), Err(CallError::TooManyPending)));
    }

    #[tokio::test]
    async fn unmatched_callback_is_rejected_not_dispatched() {
        let conn = dummy_connection();
        conn.set_state(ConnectionState::Open);
        let rejected = Arc::new(StdMutex::new(Vec::new()));
        let rejected_clone = rejected.clone();
        conn.on_packet_rejected(move |value| rejected_clone.lock().unwrap().push(value));
        conn.dispatch(Packet::Callback {
            header: Header { id: 42, target: None },
            outcome: Outcome::Ok(vec![]),
        })
        .await;
        assert_eq!(rejected.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn client_receiving_handshake_request_replies_not_a_server_and_closes() {
        let transport = FakeTransport::new();
        let conn = Connection::new_client(transport.clone(), ConnectionConfig::default());
        conn.dispatch(Packet::Handshake {
            header: Header {
                id: 0,
                target: Some("jstp".to_string()),
            },
            verb: HandshakeVerb::Request {
                strategy: "anonymous".to_string(),
                credentials: vec![],
            },
        })
        .await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("error"));
    }
}
