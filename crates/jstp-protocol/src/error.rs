use std::fmt;

use jstp_record::Value;

/// The canonical error kinds exchanged on the wire (§4.2), each with a
/// stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Handshake requested an unknown application.
    AppNotFound,
    /// Credentials rejected by the auth policy.
    AuthFailed,
    /// Inspect or call references an unknown interface.
    InterfaceNotFound,
    /// Call references an unknown method.
    MethodNotFound,
    /// A client received a handshake request (clients never accept them).
    NotAServer,
    /// Call arguments were missing or ill-typed.
    InvalidSignature,
    /// A handler panicked or otherwise crashed.
    InternalApiError,
    /// A code that doesn't match any of the above; round-trips opaquely.
    Unknown(i64),
}

impl ErrorKind {
    /// The numeric wire code for this kind.
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::AppNotFound => 1,
            ErrorKind::AuthFailed => 2,
            ErrorKind::InterfaceNotFound => 3,
            ErrorKind::MethodNotFound => 4,
            ErrorKind::NotAServer => 5,
            ErrorKind::InvalidSignature => 6,
            ErrorKind::InternalApiError => 7,
            ErrorKind::Unknown(code) => code,
        }
    }

    /// Maps a wire code back to its kind, falling back to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ErrorKind::AppNotFound,
            2 => ErrorKind::AuthFailed,
            3 => ErrorKind::InterfaceNotFound,
            4 => ErrorKind::MethodNotFound,
            5 => ErrorKind::NotAServer,
            6 => ErrorKind::InvalidSignature,
            7 => ErrorKind::InternalApiError,
            other => ErrorKind::Unknown(other),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::AppNotFound => "application not found",
            ErrorKind::AuthFailed => "authentication failed",
            ErrorKind::InterfaceNotFound => "interface not found",
            ErrorKind::MethodNotFound => "method not found",
            ErrorKind::NotAServer => "not a server",
            ErrorKind::InvalidSignature => "invalid call signature",
            ErrorKind::InternalApiError => "internal API error",
            ErrorKind::Unknown(code) => return write!(f, "error {code}"),
        };
        f.write_str(label)
    }
}

/// A wire-formatted remote error: `[code, ...humanMessages?]`.
///
/// This is what callers actually see for an application-level failure —
/// transport and protocol-level problems surface as [`crate::ProtocolError`]
/// or [`jstp_transport::TransportError`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    /// The canonical kind (or opaque code) carried by this error.
    pub kind: ErrorKind,
    /// Optional human-readable messages appended after the code.
    pub messages: Vec<String>,
}

impl RemoteError {
    /// Builds a bare error with no message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            messages: Vec::new(),
        }
    }

    /// Builds an error carrying a single human-readable message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            messages: vec![message.into()],
        }
    }

    /// Encodes this error as the wire sequence `[code, ...messages]`.
    pub fn to_wire(&self) -> Vec<Value> {
        let mut seq = vec![Value::Int(self.kind.code())];
        seq.extend(self.messages.iter().cloned().map(Value::String));
        seq
    }

    /// Decodes a wire sequence `[code, ...messages]` into a `RemoteError`.
    pub fn from_wire(values: &[Value]) -> Option<Self> {
        let code = values.first()?.as_i64()?;
        let messages = values[1..]
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        Some(Self {
            kind: ErrorKind::from_code(code),
            messages,
        })
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(first) = self.messages.first() {
            write!(f, ": {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// What [`crate::Connection::call`] and friends can fail with: either the
/// peer answered with an application-level error, or the connection closed
/// (or was already too busy) before an answer arrived.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// The peer replied with a wire-formatted error.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The connection closed before a response arrived, or closed while
    /// this call was still pending.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection is already tracking its configured maximum number of
    /// pending callbacks.
    #[error("too many pending callbacks")]
    TooManyPending,
}

/// Fatal, connection-level protocol violations (§4.4, §7). Distinct from
/// [`RemoteError`]: these never reach the wire as a `callback error` — they
/// close the connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// A non-handshake packet arrived before the handshake completed, or a
    /// second handshake packet arrived after it did.
    #[error("protocol violation: {0}")]
    Violation(String),

    /// A packet's shape didn't match any recognized kind.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// The connection was already closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A transport-layer error.
    #[error(transparent)]
    Transport(#[from] jstp_transport::TransportError),

    /// A record-codec parse error.
    #[error(transparent)]
    Parse(#[from] jstp_record::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_is_bijective_for_known_codes() {
        for kind in [
            ErrorKind::AppNotFound,
            ErrorKind::AuthFailed,
            ErrorKind::InterfaceNotFound,
            ErrorKind::MethodNotFound,
            ErrorKind::NotAServer,
            ErrorKind::InvalidSignature,
            ErrorKind::InternalApiError,
        ] {
            let err = RemoteError::with_message(kind, "oops");
            let wire = err.to_wire();
            let back = RemoteError::from_wire(&wire).unwrap();
            assert_eq!(back, err);
        }
    }

    #[test]
    fn unknown_codes_round_trip_opaquely() {
        let err = RemoteError::new(ErrorKind::Unknown(42));
        let wire = err.to_wire();
        assert_eq!(wire, vec![Value::Int(42)]);
        assert_eq!(RemoteError::from_wire(&wire).unwrap(), err);
    }
}
