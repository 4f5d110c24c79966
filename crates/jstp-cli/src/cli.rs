//! Command-line argument parsing.

use clap::Parser;

/// An interactive client for JSTP servers: connects, then drops into a
/// REPL for `call`, `inspect`, `ping`, `disconnect` and `quit`.
#[derive(Parser, Debug)]
#[command(
    name = "jstp-cli",
    version,
    about = "Interactive command-line client for JSTP servers"
)]
pub struct Cli {
    /// `host:port` of the server to connect to at startup. Falls back to
    /// the configured default address, or prompts via `connect` if omitted.
    #[arg(long)]
    pub address: Option<String>,

    /// Application name to request in the handshake.
    #[arg(long)]
    pub application: Option<String>,

    /// Auth strategy: `anonymous` or `login`.
    #[arg(long, default_value = "anonymous")]
    pub strategy: String,

    /// Username, required when `--strategy login` is used.
    #[arg(long)]
    pub username: Option<String>,

    /// Password, required when `--strategy login` is used.
    #[arg(long)]
    pub password: Option<String>,

    /// Override the configured tracing filter (e.g. `debug`, `jstp=trace`).
    #[arg(long)]
    pub log_filter: Option<String>,
}
