//! # jstp-record
//!
//! The record format codec: a relaxed-JSON value grammar used as the wire
//! format for JSTP packets. Keys may be bare identifiers, strings are
//! single-quoted by default, trailing commas are tolerated, and `undefined`
//! is a first-class literal.
//!
//! This crate only implements `parse`/`stringify`. The original protocol's
//! `interprete`/`dump` pair (values carrying function references, rendered
//! via a sandboxed evaluator) is out of scope: it is not required by the
//! core protocol and a language-neutral implementation should not try to
//! emulate a JS expression evaluator.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod error;
mod parser;
mod record;
mod serializer;
mod value;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use record::Record;
pub use value::Value;

use std::time::Duration;

/// Default wall-time cap for [`parse`], per the protocol's parse-timeout requirement.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_millis(30);

/// Parses a single top-level record-format value from `text`, using the
/// default 30ms wall-time cap.
pub fn parse(text: &str) -> ParseResult<Value> {
    parse_with_timeout(text, DEFAULT_PARSE_TIMEOUT)
}

/// Parses a single top-level record-format value from `text`, aborting with
/// [`ParseErrorKind::Timeout`] if parsing takes longer than `timeout`.
///
/// Callers embedding the parser in a latency-sensitive path (e.g. a
/// connection's packet framing loop) should pick a cap appropriate to their
/// own budget; the protocol default is 30ms.
pub fn parse_with_timeout(text: &str, timeout: Duration) -> ParseResult<Value> {
    parser::Parser::new(text, timeout).parse_top_level()
}

/// Serializes a value back into record-format text.
///
/// `stringify` and `parse` round-trip for every value producible by either
/// direction: `parse(stringify(v)) == v` and `stringify(parse(x)) == x` for
/// round-trippable `x`.
pub fn stringify(value: &Value) -> String {
    let mut out = String::new();
    serializer::write_value(&mut out, value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_representative_packet() {
        let text = "{handshake:[0,'myApp'],login:['user','pw']}";
        let value = parse(text).unwrap();
        let back = stringify(&value);
        let reparsed = parse(&back).unwrap();
        assert_eq!(value, reparsed);
    }
}
