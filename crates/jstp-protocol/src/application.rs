use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use jstp_record::Value;

use crate::connection::Connection;
use crate::error::{ErrorKind, RemoteError};

/// The result a method handler returns: the call's result sequence, or a
/// remote error to report back to the caller.
pub type HandlerResult = Result<Vec<Value>, RemoteError>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// A method handler. Receives the connection the call arrived on and the
/// call's argument sequence; returns the result sequence or a remote error.
///
/// The original protocol's `(connection, ...args, callback)` shape is
/// replaced here with an async function returning a `Result` — Rust's
/// native equivalent of a one-shot callback — rather than threading a
/// callback parameter through by hand.
pub type Handler = Arc<dyn Fn(Arc<Connection>, Vec<Value>) -> HandlerFuture + Send + Sync>;

/// Wraps a plain async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<Connection>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |conn, args| Box::pin(f(conn, args)))
}

/// A named group of methods within an [`Application`].
pub struct Interface {
    name: String,
    methods: Vec<(String, Handler)>,
}

impl Interface {
    /// Starts building an interface with the given name.
    pub fn builder(name: impl Into<String>) -> InterfaceBuilder {
        InterfaceBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// The interface's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn method(&self, name: &str) -> Option<&Handler> {
        self.methods.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    /// The ordered list of method names, excluding names beginning with `_`
    /// (§4.3's introspection view).
    pub fn method_names(&self) -> Vec<String> {
        self.methods
            .iter()
            .map(|(n, _)| n.clone())
            .filter(|n| !n.starts_with('_'))
            .collect()
    }
}

/// Builder for an [`Interface`].
pub struct InterfaceBuilder {
    name: String,
    methods: Vec<(String, Handler)>,
}

impl InterfaceBuilder {
    /// Registers a method handler.
    pub fn method(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.methods.push((name.into(), handler));
        self
    }

    /// Finishes the interface.
    pub fn build(self) -> Interface {
        Interface {
            name: self.name,
            methods: self.methods,
        }
    }
}

/// `(name, interfaces)`: a named application exposing named interfaces of
/// named methods (§3).
pub struct Application {
    name: String,
    interfaces: HashMap<String, Interface>,
}

impl Application {
    /// Starts building an application with the given name.
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder {
            name: name.into(),
            interfaces: HashMap::new(),
        }
    }

    /// The reserved `jstp` application: empty default semantics for
    /// pre-auth clients that haven't chosen a real application yet.
    pub fn reserved_jstp() -> Application {
        Application::builder("jstp").build()
    }

    /// The application's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    /// Dispatches a call (§4.3): looks up the interface and method, invoking
    /// the handler if found. A handler panic is caught, logged at error
    /// level for process-wide visibility, and reported as
    /// `InternalApiError` rather than tearing down the connection's task.
    pub async fn call_method(
        &self,
        connection: Arc<Connection>,
        interface_name: &str,
        method_name: &str,
        args: Vec<Value>,
    ) -> HandlerResult {
        let Some(interface) = self.interfaces.get(interface_name) else {
            return Err(RemoteError::with_message(
                ErrorKind::InterfaceNotFound,
                format!("no such interface '{interface_name}'"),
            ));
        };
        let Some(method) = interface.method(method_name) else {
            return Err(RemoteError::with_message(
                ErrorKind::MethodNotFound,
                format!("no such method '{interface_name}.{method_name}'"),
            ));
        };

        match AssertUnwindSafe(method(connection, args)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&panic);
                tracing::error!(
                    application = %self.name,
                    interface = interface_name,
                    method = method_name,
                    %message,
                    "handler panicked"
                );
                Err(RemoteError::with_message(ErrorKind::InternalApiError, message))
            }
        }
    }

    /// The ordered method list for an interface, or `None` if it doesn't exist.
    pub fn get_methods(&self, interface_name: &str) -> Option<Vec<String>> {
        self.interfaces.get(interface_name).map(Interface::method_names)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

/// Builder for an [`Application`].
pub struct ApplicationBuilder {
    name: String,
    interfaces: HashMap<String, Interface>,
}

impl ApplicationBuilder {
    /// Registers an interface.
    pub fn interface(mut self, interface: Interface) -> Self {
        self.interfaces.insert(interface.name().to_string(), interface);
        self
    }

    /// Finishes the application.
    pub fn build(self) -> Application {
        Application {
            name: self.name,
            interfaces: self.interfaces,
        }
    }
}

/// An immutable, process-scoped table of applications, keyed by name,
/// registered once at server construction (§4.3, §3).
#[derive(Default)]
pub struct ApplicationRegistry {
    applications: HashMap<String, Arc<Application>>,
}

impl ApplicationRegistry {
    /// Builds a registry from a set of applications, implicitly adding the
    /// reserved `jstp` application if the caller didn't supply one.
    pub fn new(applications: impl IntoIterator<Item = Application>) -> Self {
        let mut map: HashMap<String, Arc<Application>> = applications
            .into_iter()
            .map(|app| (app.name().to_string(), Arc::new(app)))
            .collect();
        map.entry("jstp".to_string())
            .or_insert_with(|| Arc::new(Application::reserved_jstp()));
        Self { applications: map }
    }

    /// Looks up an application by name.
    pub fn get(&self, name: &str) -> Option<Arc<Application>> {
        self.applications.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> ApplicationRegistry {
        let calc = Application::builder("calc")
            .interface(
                Interface::builder("calc")
                    .method(
                        "add",
                        handler(|_conn, args| async move {
                            let a = args.first().and_then(Value::as_i64).unwrap_or(0);
                            let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
                            Ok(vec![Value::Int(a + b)])
                        }),
                    )
                    .method(
                        "_private",
                        handler(|_conn, _args| async move { Ok(vec![]) }),
                    )
                    .build(),
            )
            .build();
        ApplicationRegistry::new([calc])
    }

    fn dummy_connection() -> Arc<Connection> {
        crate::connection::tests::dummy_connection()
    }

    #[tokio::test]
    async fn dispatches_known_method() {
        let registry = test_registry();
        let app = registry.get("calc").unwrap();
        let result = app
            .call_method(dummy_connection(), "calc", "add", vec![Value::Int(2), Value::Int(3)])
            .await
            .unwrap();
        assert_eq!(result, vec![Value::Int(5)]);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let registry = test_registry();
        let app = registry.get("calc").unwrap();
        let err = app
            .call_method(dummy_connection(), "calc", "zap", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MethodNotFound);
    }

    #[tokio::test]
    async fn unknown_interface_is_interface_not_found() {
        let registry = test_registry();
        let app = registry.get("calc").unwrap();
        let err = app
            .call_method(dummy_connection(), "nope", "add", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InterfaceNotFound);
    }

    #[test]
    fn introspection_excludes_underscore_methods() {
        let registry = test_registry();
        let app = registry.get("calc").unwrap();
        assert_eq!(app.get_methods("calc").unwrap(), vec!["add".to_string()]);
    }

    #[test]
    fn reserved_jstp_application_always_present() {
        let registry = ApplicationRegistry::new([]);
        assert!(registry.get("jstp").is_some());
    }
}
