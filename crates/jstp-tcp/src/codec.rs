use bytes::BytesMut;
use jstp_transport::TransportError;
use tokio_util::codec::{Decoder, Encoder};

/// Frames a byte stream into JSTP packets by scanning for a balanced
/// top-level `{...}` record — every JSTP packet, heartbeats included, is a
/// single object at the wire's top level. Unlike newline-delimited or
/// length-prefixed framing, the frame boundary is the record grammar itself:
/// quoted strings and `//`/`/* */` comments are scanned over so that a
/// brace inside either doesn't affect the nesting depth.
pub struct RecordCodec {
    max_frame_len: usize,
}

impl RecordCodec {
    /// Builds a codec that refuses to buffer more than `max_frame_len`
    /// bytes of an incomplete frame.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(8 * 1024 * 1024)
    }
}

impl Decoder for RecordCodec {
    type Item = jstp_record::Value;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(end) = find_frame_end(src) else {
            if src.len() > self.max_frame_len {
                return Err(TransportError::Framing(format!(
                    "frame exceeded {} bytes without closing",
                    self.max_frame_len
                )));
            }
            return Ok(None);
        };
        let frame = src.split_to(end);
        let text = std::str::from_utf8(&frame).map_err(|e| TransportError::Framing(e.to_string()))?;
        let value = jstp_record::parse(text).map_err(|e| TransportError::Framing(e.to_string()))?;
        Ok(Some(value))
    }
}

impl Encoder<String> for RecordCodec {
    type Error = TransportError;

    fn encode(&mut self, data: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(data.as_bytes());
        Ok(())
    }
}

/// Returns the index one past a complete top-level `{...}` record's closing
/// brace, or `None` if `buf` doesn't yet hold one.
fn find_frame_end(buf: &[u8]) -> Option<usize> {
    let mut depth = 0i32;
    let mut started = false;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    let mut i = 0;
    while i < buf.len() {
        let b = buf[i];

        if in_line_comment {
            if b == b'\n' {
                in_line_comment = false;
            }
            i += 1;
            continue;
        }
        if in_block_comment {
            if b == b'*' && buf.get(i + 1) == Some(&b'/') {
                in_block_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' => in_string = Some(b),
            b'/' if buf.get(i + 1) == Some(&b'/') => {
                in_line_comment = true;
                i += 2;
                continue;
            }
            b'/' if buf.get(i + 1) == Some(&b'*') => {
                in_block_comment = true;
                i += 2;
                continue;
            }
            b'{' => {
                depth += 1;
                started = true;
            }
            b'}' => {
                depth -= 1;
                if started && depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_single_complete_frame() {
        let mut codec = RecordCodec::default();
        let mut buf = BytesMut::from("{ping:[1]}");
        let value = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(value, jstp_record::parse("{ping:[1]}").unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_more_bytes_on_an_incomplete_frame() {
        let mut codec = RecordCodec::default();
        let mut buf = BytesMut::from("{ping:[1");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn leaves_a_trailing_frame_in_the_buffer() {
        let mut codec = RecordCodec::default();
        let mut buf = BytesMut::from("{ping:[1]}{pong:[1]}");
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, jstp_record::parse("{ping:[1]}").unwrap());
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, jstp_record::parse("{pong:[1]}").unwrap());
    }

    #[test]
    fn ignores_braces_inside_quoted_strings() {
        let mut codec = RecordCodec::default();
        let mut buf = BytesMut::from("{event:[1,'x'],greet:['hi {there}']}");
        let value = codec.decode(&mut buf).unwrap().unwrap();
        assert!(value.as_object().is_some());
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_a_frame_past_the_configured_limit() {
        let mut codec = RecordCodec::new(4);
        let mut buf = BytesMut::from("{ping:[1");
        assert!(codec.decode(&mut buf).is_err());
    }
}
