//! Layered configuration for the CLI, loaded the way `jstp-server` loads
//! its own config: built-in defaults, then an optional `jstp-cli.toml`,
//! then `JSTPCLI_`-prefixed environment variables.

use serde::Deserialize;

use crate::error::CliResult;

/// Defaults baked into the CLI when no config file or flag overrides them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// `host:port` to dial when `connect` is given no argument.
    pub default_address: String,
    /// Application name to request in the handshake when none is given.
    pub default_application: String,
    /// `tracing_subscriber::EnvFilter` directive used unless `RUST_LOG` is set.
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_address: "127.0.0.1:3000".to_string(),
            default_application: "chat".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Loads config from defaults, an optional `jstp-cli` config file in
    /// the current directory, and `JSTPCLI_`-prefixed environment
    /// variables, in that order of increasing precedence.
    pub fn load() -> CliResult<Self> {
        let defaults = Self::default();
        let built = config::Config::builder()
            .set_default("default_address", defaults.default_address)?
            .set_default("default_application", defaults.default_application)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(config::File::with_name("jstp-cli").required(false))
            .add_source(config::Environment::with_prefix("JSTPCLI").separator("_"))
            .build()?;
        Ok(built.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_connect_anonymously_to_localhost() {
        let config = CliConfig::default();
        assert_eq!(config.default_address, "127.0.0.1:3000");
        assert_eq!(config.default_application, "chat");
    }
}
