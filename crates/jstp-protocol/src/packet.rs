use jstp_record::{Record, Value};

use crate::error::{ProtocolError, RemoteError};

/// The header's `[packetId]` or `[packetId, target]` shape, common to every
/// packet kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// The originator-assigned packet id. Sign disambiguates the
    /// originator: non-negative for client-issued ids, non-positive for
    /// server-issued ids.
    pub id: i64,
    /// The interface or application name, when the kind carries one.
    pub target: Option<String>,
}

impl Header {
    fn parse(value: &Value) -> Result<Self, ProtocolError> {
        let items = value
            .as_array()
            .ok_or_else(|| ProtocolError::Malformed("header must be an array".into()))?;
        if items.is_empty() || items.len() > 2 {
            return Err(ProtocolError::Malformed(
                "header must have 1 or 2 elements".into(),
            ));
        }
        let id = items[0]
            .as_i64()
            .ok_or_else(|| ProtocolError::Malformed("header id must be an integer".into()))?;
        let target = match items.get(1) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ProtocolError::Malformed("header target must be a string".into())),
            None => None,
        };
        Ok(Header { id, target })
    }

    fn to_value(&self) -> Value {
        match &self.target {
            Some(target) => Value::Array(vec![Value::Int(self.id), Value::String(target.clone())]),
            None => Value::Array(vec![Value::Int(self.id)]),
        }
    }
}

/// The handshake verb's request/response shapes (§3, §6).
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeVerb {
    /// A client's handshake request: the auth strategy name plus credentials.
    Request {
        /// The auth strategy, defaulting to `"anonymous"` when absent on the wire.
        strategy: String,
        /// The credential sequence, e.g. `[user, password]` for `login`.
        credentials: Vec<Value>,
    },
    /// A server's successful handshake response.
    Ok {
        /// The session id the server minted.
        session_id: Value,
    },
    /// A server's failed handshake response.
    Error(RemoteError),
}

/// A callback's `ok`/`error` outcome (§3, §6), shared by `callback` packets
/// and (implicitly) by how a ping's matching `pong` resolves its callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Successful result sequence.
    Ok(Vec<Value>),
    /// A wire-formatted remote error.
    Error(RemoteError),
}

/// A fully parsed inbound packet (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// The empty mapping: a heartbeat, silently accepted in any state.
    Heartbeat,
    /// `{handshake: [...], ...}`.
    Handshake { header: Header, verb: HandshakeVerb },
    /// `{call: [id, interface], method: [args...]}`.
    Call {
        header: Header,
        method: String,
        args: Vec<Value>,
    },
    /// `{callback: [id], ok|error: ...}`.
    Callback { header: Header, outcome: Outcome },
    /// `{event: [id, interface], name: [args...]}`.
    Event {
        header: Header,
        name: String,
        args: Vec<Value>,
    },
    /// `{inspect: [id, interface]}`.
    Inspect { header: Header },
    /// `{ping: [id]}`.
    Ping { header: Header },
    /// `{pong: [id]}`.
    Pong { header: Header },
}

impl Packet {
    /// The packet's originating id, if it has one (heartbeats don't).
    pub fn id(&self) -> Option<i64> {
        match self {
            Packet::Heartbeat => None,
            Packet::Handshake { header, .. }
            | Packet::Call { header, .. }
            | Packet::Callback { header, .. }
            | Packet::Event { header, .. }
            | Packet::Inspect { header }
            | Packet::Ping { header }
            | Packet::Pong { header } => Some(header.id),
        }
    }

    /// Parses a raw record-format value into a [`Packet`].
    pub fn parse(value: &Value) -> Result<Self, ProtocolError> {
        if value.is_heartbeat() {
            return Ok(Packet::Heartbeat);
        }
        let record = value
            .as_object()
            .ok_or_else(|| ProtocolError::Malformed("packet must be an object".into()))?;
        let header_key = record
            .first_key()
            .ok_or_else(|| ProtocolError::Malformed("packet has no header key".into()))?
            .to_string();
        let header_value = record.get(&header_key).expect("first_key implies get");
        let header = Header::parse(header_value)?;
        let verb_key = record.second_key();

        match header_key.as_str() {
            "handshake" => Self::parse_handshake(record, header, verb_key),
            "call" => Self::parse_call(record, header, verb_key),
            "callback" => Self::parse_callback(record, header, verb_key),
            "event" => Self::parse_event(record, header, verb_key),
            "inspect" => Ok(Packet::Inspect { header }),
            "ping" => Ok(Packet::Ping { header }),
            "pong" => Ok(Packet::Pong { header }),
            other => Err(ProtocolError::Malformed(format!("unknown packet kind '{other}'"))),
        }
    }

    fn parse_handshake(
        record: &Record,
        header: Header,
        verb_key: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        let verb = match verb_key {
            Some("ok") => HandshakeVerb::Ok {
                session_id: record.get("ok").cloned().unwrap_or(Value::Null),
            },
            Some("error") => {
                let items = record
                    .get("error")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ProtocolError::Malformed("handshake error must be an array".into()))?;
                let err = RemoteError::from_wire(items)
                    .ok_or_else(|| ProtocolError::Malformed("malformed handshake error".into()))?;
                HandshakeVerb::Error(err)
            }
            Some(strategy) => {
                let credentials = record
                    .get(strategy)
                    .and_then(Value::as_array)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                HandshakeVerb::Request {
                    strategy: strategy.to_string(),
                    credentials,
                }
            }
            None => HandshakeVerb::Request {
                strategy: "anonymous".to_string(),
                credentials: Vec::new(),
            },
        };
        Ok(Packet::Handshake { header, verb })
    }

    fn parse_call(record: &Record, header: Header, verb_key: Option<&str>) -> Result<Self, ProtocolError> {
        let method = verb_key
            .ok_or_else(|| ProtocolError::Malformed("call packet has no method verb".into()))?
            .to_string();
        let args = record
            .get(&method)
            .and_then(Value::as_array)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        Ok(Packet::Call { header, method, args })
    }

    fn parse_callback(
        record: &Record,
        header: Header,
        verb_key: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        let outcome = match verb_key {
            Some("ok") => {
                let results = record
                    .get("ok")
                    .and_then(Value::as_array)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                Outcome::Ok(results)
            }
            Some("error") => {
                let items = record
                    .get("error")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ProtocolError::Malformed("callback error must be an array".into()))?;
                let err = RemoteError::from_wire(items)
                    .ok_or_else(|| ProtocolError::Malformed("malformed callback error".into()))?;
                Outcome::Error(err)
            }
            _ => return Err(ProtocolError::Malformed("callback packet needs 'ok' or 'error'".into())),
        };
        Ok(Packet::Callback { header, outcome })
    }

    fn parse_event(record: &Record, header: Header, verb_key: Option<&str>) -> Result<Self, ProtocolError> {
        let name = verb_key
            .ok_or_else(|| ProtocolError::Malformed("event packet has no event name verb".into()))?
            .to_string();
        let args = record
            .get(&name)
            .and_then(Value::as_array)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        Ok(Packet::Event { header, name, args })
    }

    /// Reconstructs the wire-format value this packet parses to, the
    /// inverse of [`Packet::parse`]. Used to hand an already-parsed packet
    /// to a `packetRejected` listener when it's rejected for reasons other
    /// than failing to parse in the first place (wrong state, duplicate
    /// handshake).
    pub fn to_value(&self) -> Value {
        let mut record = Record::new();
        match self {
            Packet::Heartbeat => return Value::empty_object(),
            Packet::Handshake { header, verb } => {
                record.insert("handshake", header.to_value());
                match verb {
                    HandshakeVerb::Request { strategy, credentials } => {
                        record.insert(strategy, Value::Array(credentials.clone()));
                    }
                    HandshakeVerb::Ok { session_id } => record.insert("ok", session_id.clone()),
                    HandshakeVerb::Error(err) => record.insert("error", Value::Array(err.to_wire())),
                }
            }
            Packet::Call { header, method, args } => {
                record.insert("call", header.to_value());
                record.insert(method, Value::Array(args.clone()));
            }
            Packet::Callback { header, outcome } => {
                record.insert("callback", header.to_value());
                match outcome {
                    Outcome::Ok(values) => record.insert("ok", Value::Array(values.clone())),
                    Outcome::Error(err) => record.insert("error", Value::Array(err.to_wire())),
                }
            }
            Packet::Event { header, name, args } => {
                record.insert("event", header.to_value());
                record.insert(name, Value::Array(args.clone()));
            }
            Packet::Inspect { header } => record.insert("inspect", header.to_value()),
            Packet::Ping { header } => record.insert("ping", header.to_value()),
            Packet::Pong { header } => record.insert("pong", header.to_value()),
        }
        Value::Object(record)
    }
}

/// Builders for outbound packets. Kept free of any connection state so they
/// can be unit tested in isolation from the state machine.
pub mod build {
    use super::*;

    /// The empty mapping used as a heartbeat.
    pub fn heartbeat() -> Value {
        Value::empty_object()
    }

    /// `{handshake: [id, app], strategy: credentials}`.
    pub fn handshake_request(id: i64, app: &str, strategy: &str, credentials: Vec<Value>) -> Value {
        let mut record = Record::new();
        record.insert(
            "handshake",
            Value::Array(vec![Value::Int(id), Value::String(app.to_string())]),
        );
        record.insert(strategy, Value::Array(credentials));
        Value::Object(record)
    }

    /// `{handshake: [id], ok: sessionId}`.
    pub fn handshake_ok(id: i64, session_id: Value) -> Value {
        let mut record = Record::new();
        record.insert("handshake", Value::Array(vec![Value::Int(id)]));
        record.insert("ok", session_id);
        Value::Object(record)
    }

    /// `{handshake: [id], error: [code, ...]}`.
    pub fn handshake_error(id: i64, err: &RemoteError) -> Value {
        let mut record = Record::new();
        record.insert("handshake", Value::Array(vec![Value::Int(id)]));
        record.insert("error", Value::Array(err.to_wire()));
        Value::Object(record)
    }

    /// `{call: [id, interface], method: [args...]}`.
    pub fn call(id: i64, interface: &str, method: &str, args: Vec<Value>) -> Value {
        let mut record = Record::new();
        record.insert(
            "call",
            Value::Array(vec![Value::Int(id), Value::String(interface.to_string())]),
        );
        record.insert(method, Value::Array(args));
        Value::Object(record)
    }

    /// `{callback: [id], ok: [results...]}`.
    pub fn callback_ok(id: i64, results: Vec<Value>) -> Value {
        let mut record = Record::new();
        record.insert("callback", Value::Array(vec![Value::Int(id)]));
        record.insert("ok", Value::Array(results));
        Value::Object(record)
    }

    /// `{callback: [id], error: [code, ...]}`.
    pub fn callback_error(id: i64, err: &RemoteError) -> Value {
        let mut record = Record::new();
        record.insert("callback", Value::Array(vec![Value::Int(id)]));
        record.insert("error", Value::Array(err.to_wire()));
        Value::Object(record)
    }

    /// `{event: [id, interface], name: [args...]}`.
    pub fn event(id: i64, interface: &str, name: &str, args: Vec<Value>) -> Value {
        let mut record = Record::new();
        record.insert(
            "event",
            Value::Array(vec![Value::Int(id), Value::String(interface.to_string())]),
        );
        record.insert(name, Value::Array(args));
        Value::Object(record)
    }

    /// `{inspect: [id, interface]}`.
    pub fn inspect(id: i64, interface: &str) -> Value {
        let mut record = Record::new();
        record.insert(
            "inspect",
            Value::Array(vec![Value::Int(id), Value::String(interface.to_string())]),
        );
        Value::Object(record)
    }

    /// `{ping: [id]}`.
    pub fn ping(id: i64) -> Value {
        let mut record = Record::new();
        record.insert("ping", Value::Array(vec![Value::Int(id)]));
        Value::Object(record)
    }

    /// `{pong: [id]}`.
    pub fn pong(id: i64) -> Value {
        let mut record = Record::new();
        record.insert("pong", Value::Array(vec![Value::Int(id)]));
        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_anonymous_handshake_request() {
        let value = build::handshake_request(0, "jstp", "anonymous", vec![]);
        let packet = Packet::parse(&value).unwrap();
        assert_eq!(
            packet,
            Packet::Handshake {
                header: Header {
                    id: 0,
                    target: Some("jstp".to_string())
                },
                verb: HandshakeVerb::Request {
                    strategy: "anonymous".to_string(),
                    credentials: vec![]
                }
            }
        );
    }

    #[test]
    fn parses_handshake_without_verb_as_anonymous() {
        let value = jstp_record::parse("{handshake:[0,'jstp']}").unwrap();
        let packet = Packet::parse(&value).unwrap();
        match packet {
            Packet::Handshake {
                verb: HandshakeVerb::Request { strategy, credentials },
                ..
            } => {
                assert_eq!(strategy, "anonymous");
                assert!(credentials.is_empty());
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn parses_call_and_round_trips_args() {
        let value = build::call(1, "calc", "add", vec![Value::Int(2), Value::Int(3)]);
        let packet = Packet::parse(&value).unwrap();
        assert_eq!(
            packet,
            Packet::Call {
                header: Header {
                    id: 1,
                    target: Some("calc".to_string())
                },
                method: "add".to_string(),
                args: vec![Value::Int(2), Value::Int(3)]
            }
        );
    }

    #[test]
    fn parses_callback_error() {
        let err = RemoteError::new(ErrorKind::MethodNotFound);
        let value = build::callback_error(1, &err);
        let packet = Packet::parse(&value).unwrap();
        assert_eq!(
            packet,
            Packet::Callback {
                header: Header { id: 1, target: None },
                outcome: Outcome::Error(err)
            }
        );
    }

    #[test]
    fn heartbeat_is_the_empty_object() {
        assert_eq!(Packet::parse(&Value::empty_object()).unwrap(), Packet::Heartbeat);
    }

    #[test]
    fn rejects_header_with_too_many_elements() {
        let value = jstp_record::parse("{ping:[1,2,3]}").unwrap();
        assert!(Packet::parse(&value).is_err());
    }

    #[test]
    fn to_value_round_trips_through_parse() {
        let original = build::call(1, "calc", "add", vec![Value::Int(2), Value::Int(3)]);
        let packet = Packet::parse(&original).unwrap();
        let reconstructed = packet.to_value();
        assert_eq!(Packet::parse(&reconstructed).unwrap(), packet);
    }

    #[test]
    fn heartbeat_to_value_is_the_empty_object() {
        assert_eq!(Packet::Heartbeat.to_value(), Value::empty_object());
    }
}
