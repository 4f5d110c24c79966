use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use jstp_protocol::{ErrorKind, RemoteError, SessionGrant};
use jstp_record::Value;
use uuid::Uuid;

/// The server-side half of §4.6: recognizes a strategy name and a
/// credential sequence, and either grants a session or fails with
/// `AuthFailed`.
///
/// A hosting application can implement this directly to add its own
/// strategies; [`DefaultAuthPolicy`] already covers the two the protocol
/// names explicitly (`anonymous`, `login`).
#[async_trait]
pub trait AuthPolicy: Send + Sync {
    /// Attempts to start a session for the given strategy and credentials.
    async fn start_session(&self, strategy: &str, credentials: Vec<Value>) -> Result<SessionGrant, RemoteError>;
}

/// Verifies a username/password pair. Implemented by [`InMemoryCredentialStore`]
/// for the common case; a real deployment would back this with a database.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns `true` if `username`/`password` is a valid pair.
    async fn verify(&self, username: &str, password: &str) -> bool;
}

/// A `login` credential store backed by an in-memory table. Fine for
/// examples, tests and small deployments; not persisted across restarts.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    /// Builds an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a user's password.
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn verify(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|entry| entry.value() == password)
    }
}

/// The built-in auth policy (§4.6): `anonymous` always succeeds with no
/// username and a freshly minted session id; `login` validates
/// `[user, password]` against a [`CredentialStore`]; any other strategy
/// name fails with `AuthFailed`.
pub struct DefaultAuthPolicy {
    credentials: Arc<dyn CredentialStore>,
}

impl DefaultAuthPolicy {
    /// Builds a policy backed by the given credential store.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

impl Default for DefaultAuthPolicy {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryCredentialStore::new()))
    }
}

#[async_trait]
impl AuthPolicy for DefaultAuthPolicy {
    async fn start_session(&self, strategy: &str, credentials: Vec<Value>) -> Result<SessionGrant, RemoteError> {
        match strategy {
            "anonymous" => Ok(SessionGrant {
                username: None,
                session_id: new_session_id(),
            }),
            "login" => {
                let username = credentials.first().and_then(Value::as_str);
                let password = credentials.get(1).and_then(Value::as_str);
                match (username, password) {
                    (Some(username), Some(password)) if self.credentials.verify(username, password).await => {
                        Ok(SessionGrant {
                            username: Some(username.to_string()),
                            session_id: new_session_id(),
                        })
                    }
                    _ => Err(RemoteError::with_message(ErrorKind::AuthFailed, "invalid credentials")),
                }
            }
            other => Err(RemoteError::with_message(
                ErrorKind::AuthFailed,
                format!("unrecognized strategy '{other}'"),
            )),
        }
    }
}

fn new_session_id() -> Value {
    Value::String(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_always_succeeds_with_no_username() {
        let policy = DefaultAuthPolicy::default();
        let grant = policy.start_session("anonymous", vec![]).await.unwrap();
        assert!(grant.username.is_none());
        assert!(matches!(grant.session_id, Value::String(_)));
    }

    #[tokio::test]
    async fn login_succeeds_for_known_credentials() {
        let store = InMemoryCredentialStore::new();
        store.add_user("alice", "hunter2");
        let policy = DefaultAuthPolicy::new(Arc::new(store));
        let grant = policy
            .start_session(
                "login",
                vec![Value::String("alice".to_string()), Value::String("hunter2".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(grant.username, Some("alice".to_string()));
    }

    #[tokio::test]
    async fn login_fails_for_wrong_password() {
        let store = InMemoryCredentialStore::new();
        store.add_user("alice", "hunter2");
        let policy = DefaultAuthPolicy::new(Arc::new(store));
        let err = policy
            .start_session(
                "login",
                vec![Value::String("alice".to_string()), Value::String("wrong".to_string())],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthFailed);
    }

    #[tokio::test]
    async fn unknown_strategy_fails_auth() {
        let policy = DefaultAuthPolicy::default();
        let err = policy.start_session("carrier-pigeon", vec![]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthFailed);
    }

    #[tokio::test]
    async fn two_anonymous_sessions_get_distinct_ids() {
        let policy = DefaultAuthPolicy::default();
        let a = policy.start_session("anonymous", vec![]).await.unwrap();
        let b = policy.start_session("anonymous", vec![]).await.unwrap();
        assert_ne!(a.session_id, b.session_id);
    }
}
