use std::sync::{Arc, Weak};

use jstp_record::Value;

use crate::connection::Connection;
use crate::error::CallError;

/// A client-side façade for a single remote interface (§3): the result of
/// `inspect`-ing an interface, bundled with the connection and interface
/// name so callers don't have to thread them through by hand.
///
/// `RemoteProxy` is a thin convenience: `connection.call(interface, method,
/// args)` works just as well without one. What a proxy adds is the cached
/// method list from the original inspect and a guard against calling a
/// method the peer never advertised.
///
/// Holds its connection weakly: [`Connection`] caches proxies under
/// `remoteProxies` (§3), and a strong back-reference here would keep the
/// connection alive forever through its own cache.
#[derive(Debug, Clone)]
pub struct RemoteProxy {
    connection: Weak<Connection>,
    interface: String,
    methods: Vec<String>,
}

impl RemoteProxy {
    /// Inspects `interface` on `connection`, returning the cached proxy if
    /// this connection has already inspected it (§4.4); otherwise builds
    /// one, caches it under the interface name, and returns it.
    pub async fn inspect(connection: Arc<Connection>, interface: &str) -> Result<Self, CallError> {
        if let Some(cached) = connection.cached_remote_proxy(interface) {
            return Ok(cached);
        }
        let methods = connection.inspect(interface).await?;
        let proxy = Self {
            connection: Arc::downgrade(&connection),
            interface: interface.to_string(),
            methods,
        };
        connection.cache_remote_proxy(proxy.clone());
        Ok(connection.cached_remote_proxy(interface).unwrap_or(proxy))
    }

    fn connection(&self) -> Result<Arc<Connection>, CallError> {
        self.connection.upgrade().ok_or(CallError::ConnectionClosed)
    }

    /// The interface name this proxy was built for.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// The method names the peer advertised at inspect time. May go stale
    /// if the peer's interface changes afterward.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Calls a method on the proxied interface.
    ///
    /// Checking `methods()` first is advisory only — nothing stops the
    /// peer from registering a method after the inspect that produced this
    /// proxy, and a stale negative here would reject a call that the peer
    /// would in fact serve.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, CallError> {
        self.connection()?.call(&self.interface, method, args).await
    }

    /// Emits an event addressed to the proxied interface.
    pub async fn emit(&self, name: &str, args: Vec<Value>) -> Result<(), CallError> {
        self.connection()?.emit_event(&self.interface, name, args).await
    }

    /// Registers a listener for events named `name` arriving on this
    /// proxy's interface. Events for other interfaces, or other names on
    /// this one, are filtered out before the listener ever sees them —
    /// the connection-wide fan-in from [`Connection::on_event`], narrowed
    /// back down to what this proxy represents.
    pub fn on(&self, name: &str, listener: impl Fn(Vec<Value>) + Send + Sync + 'static) -> Result<(), CallError> {
        let interface = self.interface.clone();
        let name = name.to_string();
        self.connection()?.on_event(move |notice| {
            if notice.interface == interface && notice.name == name {
                listener(notice.args.clone());
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closing_mid_inspect_fails_the_call() {
        let conn = crate::connection::tests::dummy_connection();
        let waiter = conn.clone();
        let handle = tokio::spawn(async move { RemoteProxy::inspect(waiter, "calc").await });
        tokio::task::yield_now().await;
        conn.close().await;
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(CallError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn cached_proxy_is_returned_for_repeat_interface() {
        let conn = crate::connection::tests::dummy_connection();
        let first = RemoteProxy {
            connection: Arc::downgrade(&conn),
            interface: "calc".to_string(),
            methods: vec!["add".to_string()],
        };
        conn.cache_remote_proxy(first.clone());

        let cached = conn.cached_remote_proxy("calc").expect("proxy was cached");
        assert_eq!(cached.interface(), "calc");
        assert_eq!(cached.methods(), first.methods());
    }

    #[tokio::test]
    async fn caching_keeps_the_first_proxy_built_for_an_interface() {
        let conn = crate::connection::tests::dummy_connection();
        let first = RemoteProxy {
            connection: Arc::downgrade(&conn),
            interface: "calc".to_string(),
            methods: vec!["add".to_string()],
        };
        conn.cache_remote_proxy(first.clone());

        let second = RemoteProxy {
            connection: Arc::downgrade(&conn),
            interface: "calc".to_string(),
            methods: vec!["subtract".to_string()],
        };
        conn.cache_remote_proxy(second);

        let cached = conn.cached_remote_proxy("calc").unwrap();
        assert_eq!(cached.methods(), first.methods());
    }
}
