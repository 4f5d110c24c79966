use async_trait::async_trait;
use jstp_record::Value;

/// The application name, auth strategy and credential sequence a client
/// sends in its handshake request (§4.6). Produced by a [`ConnectPolicy`]
/// so the connect call site doesn't have to hardcode them.
#[derive(Debug, Clone)]
pub struct HandshakeArgs {
    /// The application to authenticate against.
    pub application: String,
    /// The auth strategy name, matched against the server's registered
    /// strategies (`"anonymous"`, `"login"`, or a custom one).
    pub strategy: String,
    /// The strategy-specific credential sequence.
    pub credentials: Vec<Value>,
}

/// Supplies handshake arguments for an outbound connection attempt. Kept
/// as a trait, rather than a plain struct, so a caller can do something
/// more interesting than return a constant — prompt for a password,
/// refresh a token, round-robin between a pool of accounts.
#[async_trait]
pub trait ConnectPolicy: Send + Sync {
    /// Produces the arguments for the next handshake attempt.
    async fn handshake_args(&self) -> HandshakeArgs;
}

/// Connects anonymously to a fixed application.
#[derive(Debug, Clone)]
pub struct AnonymousConnect {
    application: String,
}

impl AnonymousConnect {
    /// Builds a policy that authenticates anonymously against `application`.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
        }
    }
}

#[async_trait]
impl ConnectPolicy for AnonymousConnect {
    async fn handshake_args(&self) -> HandshakeArgs {
        HandshakeArgs {
            application: self.application.clone(),
            strategy: "anonymous".to_string(),
            credentials: Vec::new(),
        }
    }
}

/// Connects with a fixed username/password pair using the `login` strategy.
#[derive(Debug, Clone)]
pub struct LoginConnect {
    application: String,
    username: String,
    password: String,
}

impl LoginConnect {
    /// Builds a policy that authenticates `username`/`password` against
    /// `application` using the `login` strategy.
    pub fn new(application: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl ConnectPolicy for LoginConnect {
    async fn handshake_args(&self) -> HandshakeArgs {
        HandshakeArgs {
            application: self.application.clone(),
            strategy: "login".to_string(),
            credentials: vec![
                Value::String(self.username.clone()),
                Value::String(self.password.clone()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_connect_sends_no_credentials() {
        let args = AnonymousConnect::new("chat").handshake_args().await;
        assert_eq!(args.application, "chat");
        assert_eq!(args.strategy, "anonymous");
        assert!(args.credentials.is_empty());
    }

    #[tokio::test]
    async fn login_connect_sends_username_and_password() {
        let args = LoginConnect::new("chat", "alice", "hunter2").handshake_args().await;
        assert_eq!(args.strategy, "login");
        assert_eq!(
            args.credentials,
            vec![Value::String("alice".to_string()), Value::String("hunter2".to_string())]
        );
    }
}
