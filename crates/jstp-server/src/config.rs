use std::time::Duration;

use serde::Deserialize;

use crate::error::ServerError;

/// Server-level configuration: the heartbeat interval, pending-callback cap
/// and log verbosity a long-running server needs. Loaded as layered
/// defaults, an optional file, then environment overrides, via the `config`
/// crate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Seconds between heartbeat mappings sent on each accepted connection.
    /// `None` (the default) disables heartbeats.
    pub heartbeat_interval_secs: Option<u64>,
    /// Caps the number of callbacks any one connection tracks concurrently.
    pub max_pending_callbacks: usize,
    /// Logging verbosity passed to `tracing-subscriber`'s `EnvFilter` when
    /// the hosting binary doesn't override `JSTP_LOG`/`RUST_LOG`.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: None,
            max_pending_callbacks: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from, in increasing priority: built-in defaults,
    /// `jstp.toml` in the working directory (if present), and `JSTP_`-
    /// prefixed environment variables (e.g. `JSTP_HEARTBEAT_INTERVAL_SECS`).
    pub fn load() -> Result<Self, ServerError> {
        let config = config::Config::builder()
            .set_default("max_pending_callbacks", 10_000i64)?
            .set_default("log_filter", "info")?
            .add_source(config::File::with_name("jstp").required(false))
            .add_source(config::Environment::with_prefix("JSTP").separator("_"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// The heartbeat interval as a [`Duration`], ready to hand to
    /// [`jstp_protocol::ConnectionConfig`].
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_heartbeats() {
        let config = ServerConfig::default();
        assert!(config.heartbeat_interval().is_none());
        assert_eq!(config.max_pending_callbacks, 10_000);
    }
}
