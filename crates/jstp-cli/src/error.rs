//! Error type for the CLI binary.

use thiserror::Error;

/// Errors surfaced at the CLI's top level, wrapping whatever the library
/// crates below it produced with enough context to print something useful
/// and exit non-zero.
#[derive(Error, Debug)]
pub enum CliError {
    /// A call, inspect, ping or handshake failed.
    #[error("{0}")]
    Call(#[from] jstp_protocol::CallError),

    /// The peer rejected a handshake.
    #[error("handshake rejected: {0}")]
    Handshake(String),

    /// Dialing the server failed.
    #[error("connection failed: {0}")]
    Connect(#[from] jstp::TransportError),

    /// A typed argument or command line didn't parse as record-format text.
    #[error("invalid arguments: {0}")]
    Args(#[from] jstp_record::ParseError),

    /// Reading the optional config file failed.
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    /// The line editor failed (terminal I/O, Ctrl-D, Ctrl-C).
    #[error("{0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Not connected when a command that needs a connection was issued.
    #[error("not connected - use 'connect' first")]
    NotConnected,

    /// A REPL command was malformed.
    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
